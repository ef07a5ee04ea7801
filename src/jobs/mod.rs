// ==========================================
// 商品同步连接器 - 任务层
// ==========================================
// 职责: 持久化任务队列与任务执行
// 约束: 一次只执行一个任务；扇出只通过入队完成
// ==========================================

pub mod error;
pub mod job;
pub mod queue;
pub mod runner;

pub use error::{JobError, JobResult};
pub use job::{ConnectorJob, PRIORITY_DEFAULT, PRIORITY_MEDIUM, PRIORITY_PRODUCT_IMAGE};
pub use queue::{JobQueue, JobRecord, JobStatus, QueueStats};
pub use runner::{execute, http_adapter_provider, AdapterProvider, JobOutcome, JobRunner};
