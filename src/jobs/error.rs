// ==========================================
// 商品同步连接器 - 任务队列错误类型
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum JobError {
    #[error("队列锁获取失败: {0}")]
    LockError(String),

    #[error("队列数据库操作失败: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    #[error("任务负载序列化失败: {0}")]
    PayloadError(#[from] serde_json::Error),

    #[error("任务不存在: {0}")]
    JobNotFound(String),

    #[error("后端不存在: {0}")]
    BackendNotFound(i64),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("远程适配器创建失败: {0}")]
    AdapterError(String),
}

pub type JobResult<T> = Result<T, JobError>;
