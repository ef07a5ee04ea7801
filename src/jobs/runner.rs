// ==========================================
// 商品同步连接器 - 任务执行器
// ==========================================
// 职责: 出队 → 构建导入上下文 → 分发执行 → 记录结果
// 失败: 交由队列按 max_retries 重试，执行器本身不重试
// ==========================================

use crate::db::SharedConnection;
use crate::domain::backend::BackendContext;
use crate::domain::types::ModelName;
use crate::importer::context::{ImportContext, DEFAULT_PAGE_SIZE};
use crate::importer::error::ImportResult;
use crate::importer::extension::ExtensionRegistry;
use crate::importer::{
    import_inventory, import_product_image, import_products, import_record, import_supplierinfo,
    run_delayed, run_direct, set_product_image_variant,
};
use crate::jobs::error::{JobError, JobResult};
use crate::jobs::job::{ConnectorJob, PRIORITY_DEFAULT};
use crate::jobs::queue::{JobQueue, JobRecord, JobStatus};
use crate::remote::{HttpAdapter, RemoteAdapter, RemoteResult};
use crate::repository::BackendRepository;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// 按后端创建远程适配器
pub type AdapterProvider =
    Arc<dyn Fn(&BackendContext) -> RemoteResult<Arc<dyn RemoteAdapter>> + Send + Sync>;

/// HTTP 适配器提供者
pub fn http_adapter_provider(timeout_ms: u64, user_agent: String) -> AdapterProvider {
    Arc::new(move |backend: &BackendContext| {
        let adapter = HttpAdapter::new(&backend.api_url, &backend.api_key, timeout_ms, &user_agent)?;
        Ok(Arc::new(adapter) as Arc<dyn RemoteAdapter>)
    })
}

/// 单个任务的执行结果
#[derive(Debug, Clone, PartialEq)]
pub struct JobOutcome {
    pub job_id: String,
    pub kind: &'static str,
    /// COMPLETED / PENDING（待重试）/ FAILED
    pub status: JobStatus,
}

pub struct JobRunner {
    conn: SharedConnection,
    queue: JobQueue,
    adapters: AdapterProvider,
    extensions: Arc<ExtensionRegistry>,
    page_size: usize,
    adapter_cache: Mutex<HashMap<i64, Arc<dyn RemoteAdapter>>>,
}

impl JobRunner {
    pub fn new(
        conn: SharedConnection,
        queue: JobQueue,
        adapters: AdapterProvider,
        extensions: Arc<ExtensionRegistry>,
    ) -> Self {
        Self {
            conn,
            queue,
            adapters,
            extensions,
            page_size: DEFAULT_PAGE_SIZE,
            adapter_cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn queue(&self) -> &JobQueue {
        &self.queue
    }

    fn adapter_for(&self, backend: &BackendContext) -> JobResult<Arc<dyn RemoteAdapter>> {
        let mut cache = self
            .adapter_cache
            .lock()
            .map_err(|e| JobError::LockError(e.to_string()))?;
        if let Some(adapter) = cache.get(&backend.id) {
            return Ok(adapter.clone());
        }
        let adapter = (self.adapters)(backend).map_err(|e| JobError::AdapterError(e.to_string()))?;
        cache.insert(backend.id, adapter.clone());
        Ok(adapter)
    }

    /// 构建后端的导入上下文（每个任务一份，进行中集合互不共享）
    pub fn context_for(&self, backend_id: i64) -> JobResult<ImportContext> {
        let backend = BackendRepository::from_connection(self.conn.clone())
            .find_by_id(backend_id)?
            .ok_or(JobError::BackendNotFound(backend_id))?;
        let adapter = self.adapter_for(&backend)?;
        Ok(ImportContext::new(
            Arc::new(backend),
            self.conn.clone(),
            adapter,
            self.queue.clone(),
            self.extensions.clone(),
        )
        .with_page_size(self.page_size))
    }

    /// 处理下一个任务；队列为空时返回 None
    pub async fn process_next(&self) -> JobResult<Option<JobOutcome>> {
        let Some(record) = self.queue.dequeue()? else {
            return Ok(None);
        };
        let kind = record.job.kind();
        tracing::info!(job_id = %record.job_id, kind, backend_id = record.backend_id, "开始执行任务");

        let status = match self.run_job(&record).await {
            Ok(summary) => {
                self.queue.mark_completed(&record.job_id, Some(&summary))?;
                tracing::info!(job_id = %record.job_id, kind, result = %summary, "任务执行完成");
                JobStatus::Completed
            }
            Err(message) => {
                tracing::warn!(job_id = %record.job_id, kind, error = %message, "任务执行失败");
                self.queue.mark_failed(&record.job_id, &message)?
            }
        };

        Ok(Some(JobOutcome {
            job_id: record.job_id,
            kind,
            status,
        }))
    }

    /// 处理队列中全部任务（含重试），直到队列为空
    pub async fn process_all(&self) -> JobResult<Vec<JobOutcome>> {
        let mut outcomes = Vec::new();
        while let Some(outcome) = self.process_next().await? {
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    async fn run_job(&self, record: &JobRecord) -> Result<String, String> {
        let ctx = self
            .context_for(record.backend_id)
            .map_err(|e| e.to_string())?;
        execute(&ctx, &record.job).await.map_err(|e| e.to_string())
    }
}

/// 执行单个任务，返回结果摘要
pub async fn execute(ctx: &ImportContext, job: &ConnectorJob) -> ImportResult<String> {
    match job {
        ConnectorJob::ImportProducts { since } => {
            let submitted = import_products(ctx, since.as_deref()).await?;
            Ok(format!("submitted={}", submitted))
        }
        ConnectorJob::ImportBatch { model, filters } => {
            // 供应商信息在当前任务内直接导入
            let count = match model {
                ModelName::SupplierInfo => run_direct(ctx, *model, filters).await?,
                _ => run_delayed(ctx, *model, filters, PRIORITY_DEFAULT).await?,
            };
            Ok(format!("records={}", count))
        }
        ConnectorJob::ImportRecord {
            model,
            remote_id,
            record,
        } => {
            import_record(ctx, *model, remote_id, record.clone()).await?;
            Ok(format!("{}:{}", model, remote_id))
        }
        ConnectorJob::ImportProductImage {
            product_id,
            image_id,
        } => {
            let local_id = import_product_image(ctx, product_id, image_id).await?;
            Ok(format!("image={}", local_id))
        }
        ConnectorJob::SetProductImageVariant { combinations } => {
            set_product_image_variant(ctx, combinations).await?;
            Ok(format!("combinations={}", combinations.len()))
        }
        ConnectorJob::ImportInventory => {
            let submitted = import_inventory(ctx).await?;
            Ok(format!("submitted={}", submitted))
        }
        ConnectorJob::ImportSupplierInfo { product_id } => {
            let removed = import_supplierinfo(ctx, product_id).await?;
            Ok(format!("removed={}", removed))
        }
    }
}
