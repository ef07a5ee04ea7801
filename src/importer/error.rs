// ==========================================
// 商品同步连接器 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use crate::domain::types::ModelName;
use crate::jobs::error::JobError;
use crate::remote::error::RemoteError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 外部协作方错误 =====
    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("任务入队失败: {0}")]
    Queue(#[from] JobError),

    // ===== 数据错误 =====
    #[error("依赖未能导入: {model} remote_id={remote_id}")]
    MissingDependency { model: ModelName, remote_id: String },

    #[error("远程记录无效 ({model} remote_id={remote_id}): {message}")]
    InvalidRecord {
        model: ModelName,
        remote_id: String,
        message: String,
    },

    #[error("映射结果转换失败: {0}")]
    Serialization(String),

    #[error("模型不支持导入: {0}")]
    Unsupported(ModelName),

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ImportError {
    /// 是否为远程服务错误
    pub fn is_remote_service_error(&self) -> bool {
        matches!(self, ImportError::Remote(err) if err.is_service_error())
    }

    /// 是否为远程记录不存在
    pub fn is_remote_not_found(&self) -> bool {
        matches!(self, ImportError::Remote(err) if err.is_not_found())
    }
}

impl From<serde_json::Error> for ImportError {
    fn from(err: serde_json::Error) -> Self {
        ImportError::Serialization(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_service_error_classification() {
        let service: ImportError = RemoteError::Service {
            status: 500,
            message: "boom".to_string(),
        }
        .into();
        let transport: ImportError = RemoteError::Transport("reset".to_string()).into();

        assert!(service.is_remote_service_error());
        assert!(!service.is_remote_not_found());
        assert!(!transport.is_remote_service_error());
    }
}
