// ==========================================
// 商品同步连接器 - 核心库
// ==========================================
// 技术栈: Rust + SQLite + reqwest
// 系统定位: 从店铺 Web Service 增量导入商品目录
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 远程接口层 - Web Service 适配器
pub mod remote;

// 导入层 - 映射/依赖/导入后处理
pub mod importer;

// 任务层 - 持久化队列与执行器
pub mod jobs;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

pub use domain::{BackendContext, ModelName, NewBackend, ProductType};
pub use importer::{ImportContext, ImportError, ImportResult};
pub use jobs::{ConnectorJob, JobQueue, JobRunner, JobStatus};
pub use remote::{HttpAdapter, MemoryAdapter, RemoteAdapter};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
