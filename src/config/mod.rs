// ==========================================
// 商品同步连接器 - 配置层
// ==========================================
// 职责: 全局配置读取（config_kv）与数据库路径解析
// ==========================================

pub mod config_manager;

pub use config_manager::ConfigManager;

use std::path::PathBuf;

/// 数据库路径环境变量
pub const DB_PATH_ENV: &str = "CATALOG_SYNC_DB_PATH";

/// 获取默认数据库路径
///
/// # 返回
/// - 环境变量 CATALOG_SYNC_DB_PATH（非空时）
/// - 否则: 用户数据目录/catalog-sync/catalog_sync.db
/// - 无法获取数据目录时: ./catalog_sync.db
pub fn get_default_db_path() -> String {
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./catalog_sync.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("catalog-sync");
        // 目录创建失败时退回当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("catalog_sync.db");
        }
    }
    path.to_string_lossy().to_string()
}

/// 解析数据库路径: 命令行参数优先，其次环境变量与用户数据目录
pub fn resolve_db_path(cli_path: Option<&str>) -> String {
    cli_path
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .unwrap_or_else(get_default_db_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_db_path_prefers_cli() {
        assert_eq!(resolve_db_path(Some("/tmp/x.db")), "/tmp/x.db");
        assert!(resolve_db_path(Some("  ")).ends_with(".db"));
    }
}
