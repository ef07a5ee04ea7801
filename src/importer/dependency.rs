// ==========================================
// 商品同步连接器 - 依赖解析
// ==========================================
// 职责: 单条记录导入的统一入口与依赖导入
// 规则:
// - 已绑定且未要求强制刷新 → 跳过
// - 同一 (模型, 远程 id) 正在导入 → 跳过（递归依赖重入）
// - 依赖导入同步完成后才继续主记录映射
// ==========================================

use crate::domain::record::is_unset_id;
use crate::domain::types::ModelName;
use crate::importer::attribute_importer::{OptionImporter, OptionValueImporter};
use crate::importer::category_importer::CategoryImporter;
use crate::importer::combination_importer::CombinationImporter;
use crate::importer::context::ImportContext;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::inventory_importer::InventoryRecordImporter;
use crate::importer::supplier_importer::{SupplierImporter, SupplierInfoImporter};
use crate::importer::template_importer::TemplateImporter;
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;

/// 单模型记录导入器
#[async_trait]
pub trait RecordImporter: Send + Sync {
    fn model(&self) -> ModelName;

    /// 导入一条远程记录
    ///
    /// # 参数
    /// - record: 调用方已取得的记录（批量摘要等）；None 时由导入器自行读取
    async fn run(
        &self,
        ctx: &ImportContext,
        remote_id: &str,
        record: Option<Value>,
    ) -> ImportResult<()>;
}

static TEMPLATE_IMPORTER: TemplateImporter = TemplateImporter;
static COMBINATION_IMPORTER: CombinationImporter = CombinationImporter;
static CATEGORY_IMPORTER: CategoryImporter = CategoryImporter;
static OPTION_IMPORTER: OptionImporter = OptionImporter;
static OPTION_VALUE_IMPORTER: OptionValueImporter = OptionValueImporter;
static SUPPLIER_IMPORTER: SupplierImporter = SupplierImporter;
static SUPPLIER_INFO_IMPORTER: SupplierInfoImporter = SupplierInfoImporter;
static INVENTORY_IMPORTER: InventoryRecordImporter = InventoryRecordImporter;

/// 模型对应的记录导入器
///
/// 税组由操作员手工绑定；图片按 (商品, 图片) 导入，不走此入口
pub fn importer_for(model: ModelName) -> ImportResult<&'static dyn RecordImporter> {
    match model {
        ModelName::ProductTemplate => Ok(&TEMPLATE_IMPORTER),
        ModelName::ProductCombination => Ok(&COMBINATION_IMPORTER),
        ModelName::ProductCategory => Ok(&CATEGORY_IMPORTER),
        ModelName::ProductOption => Ok(&OPTION_IMPORTER),
        ModelName::ProductOptionValue => Ok(&OPTION_VALUE_IMPORTER),
        ModelName::Supplier => Ok(&SUPPLIER_IMPORTER),
        ModelName::SupplierInfo => Ok(&SUPPLIER_INFO_IMPORTER),
        ModelName::StockAvailable => Ok(&INVENTORY_IMPORTER),
        ModelName::TaxGroup | ModelName::ProductImage => Err(ImportError::Unsupported(model)),
    }
}

/// 进行中标记；离开作用域时清除
struct InProgressGuard<'a> {
    ctx: &'a ImportContext,
    model: ModelName,
    remote_id: String,
}

impl Drop for InProgressGuard<'_> {
    fn drop(&mut self) {
        self.ctx.finish(self.model, &self.remote_id);
    }
}

/// 导入单条记录（可递归调用）
pub fn import_record<'a>(
    ctx: &'a ImportContext,
    model: ModelName,
    remote_id: &'a str,
    record: Option<Value>,
) -> BoxFuture<'a, ImportResult<()>> {
    async move {
        let remote_id = remote_id.trim();
        let importer = importer_for(model)?;

        if !ctx.begin(model, remote_id)? {
            tracing::debug!(model = %model, remote_id, "记录正在导入中，跳过重入");
            return Ok(());
        }
        let _guard = InProgressGuard {
            ctx,
            model,
            remote_id: remote_id.to_string(),
        };

        importer.run(ctx, remote_id, record).await
    }
    .boxed()
}

/// 导入依赖记录
///
/// # 参数
/// - always: true 时即使已绑定也重新导入
pub async fn import_dependency(
    ctx: &ImportContext,
    model: ModelName,
    remote_id: &str,
    always: bool,
) -> ImportResult<()> {
    if is_unset_id(Some(remote_id)) {
        return Ok(());
    }
    if !always && ctx.binder(model).is_bound(remote_id)? {
        return Ok(());
    }
    tracing::debug!(model = %model, remote_id, always, "导入依赖");
    import_record(ctx, model, remote_id, None).await
}

/// 依赖导入后取本地 id；仍未绑定视为缺失依赖
pub async fn import_and_resolve(
    ctx: &ImportContext,
    model: ModelName,
    remote_id: &str,
) -> ImportResult<i64> {
    import_dependency(ctx, model, remote_id, false).await?;
    ctx.binder(model)
        .to_local(remote_id, true)?
        .ok_or_else(|| ImportError::MissingDependency {
            model,
            remote_id: remote_id.trim().to_string(),
        })
}
