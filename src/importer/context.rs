// ==========================================
// 商品同步连接器 - 导入上下文
// ==========================================
// 职责: 一次任务执行所需的全部协作方
// - 后端配置（不可变）
// - 本地数据库连接 / 远程适配器 / 任务队列
// - 扩展映射链
// - 进行中记录集合（防止递归依赖重入）
// ==========================================

use crate::db::SharedConnection;
use crate::domain::backend::BackendContext;
use crate::domain::types::ModelName;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::extension::ExtensionRegistry;
use crate::jobs::job::ConnectorJob;
use crate::jobs::queue::JobQueue;
use crate::remote::RemoteAdapter;
use crate::repository::{
    AttributeRepository, BackendRepository, Binder, CategoryRepository, CheckpointRepository,
    ImageRepository, ProductRepository, StockRepository, SupplierRepository, TaxRepository,
};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// 每页条数默认值（批量导入）
pub const DEFAULT_PAGE_SIZE: usize = 1000;

pub struct ImportContext {
    backend: Arc<BackendContext>,
    conn: SharedConnection,
    adapter: Arc<dyn RemoteAdapter>,
    queue: JobQueue,
    extensions: Arc<ExtensionRegistry>,
    page_size: usize,
    in_progress: Mutex<HashSet<(ModelName, String)>>,
}

impl ImportContext {
    pub fn new(
        backend: Arc<BackendContext>,
        conn: SharedConnection,
        adapter: Arc<dyn RemoteAdapter>,
        queue: JobQueue,
        extensions: Arc<ExtensionRegistry>,
    ) -> Self {
        Self {
            backend,
            conn,
            adapter,
            queue,
            extensions,
            page_size: DEFAULT_PAGE_SIZE,
            in_progress: Mutex::new(HashSet::new()),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn backend(&self) -> &BackendContext {
        &self.backend
    }

    pub fn adapter(&self) -> &dyn RemoteAdapter {
        self.adapter.as_ref()
    }

    pub fn extensions(&self) -> &ExtensionRegistry {
        &self.extensions
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn queue(&self) -> &JobQueue {
        &self.queue
    }

    // ==========================================
    // 仓储
    // ==========================================

    pub fn binder(&self, model: ModelName) -> Binder {
        Binder::new(self.conn.clone(), self.backend.id, model)
    }

    pub fn backends(&self) -> BackendRepository {
        BackendRepository::from_connection(self.conn.clone())
    }

    pub fn products(&self) -> ProductRepository {
        ProductRepository::from_connection(self.conn.clone())
    }

    pub fn categories(&self) -> CategoryRepository {
        CategoryRepository::from_connection(self.conn.clone())
    }

    pub fn taxes(&self) -> TaxRepository {
        TaxRepository::from_connection(self.conn.clone())
    }

    pub fn attributes(&self) -> AttributeRepository {
        AttributeRepository::from_connection(self.conn.clone())
    }

    pub fn images(&self) -> ImageRepository {
        ImageRepository::from_connection(self.conn.clone())
    }

    pub fn stock(&self) -> StockRepository {
        StockRepository::from_connection(self.conn.clone())
    }

    pub fn suppliers(&self) -> SupplierRepository {
        SupplierRepository::from_connection(self.conn.clone())
    }

    pub fn checkpoints(&self) -> CheckpointRepository {
        CheckpointRepository::from_connection(self.conn.clone())
    }

    // ==========================================
    // 任务与重入
    // ==========================================

    /// 为当前后端提交任务
    pub fn enqueue(&self, job: &ConnectorJob, priority: i32) -> ImportResult<String> {
        Ok(self.queue.enqueue(self.backend.id, job, priority)?)
    }

    /// 标记记录进入导入；已在进行中时返回 false
    pub(crate) fn begin(&self, model: ModelName, remote_id: &str) -> ImportResult<bool> {
        let mut in_progress = self
            .in_progress
            .lock()
            .map_err(|e| ImportError::InternalError(e.to_string()))?;
        Ok(in_progress.insert((model, remote_id.to_string())))
    }

    pub(crate) fn finish(&self, model: ModelName, remote_id: &str) {
        if let Ok(mut in_progress) = self.in_progress.lock() {
            in_progress.remove(&(model, remote_id.to_string()));
        }
    }
}
