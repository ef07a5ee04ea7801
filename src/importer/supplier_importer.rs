// ==========================================
// 商品同步连接器 - 供应商信息导入
// ==========================================
// suppliers         → product_supplier
// product_suppliers → product_supplierinfo（依赖模板与供应商）
// import_supplierinfo: 批量导入后逐条复核已绑定记录，
//                      远程已不存在的记录从本地删除
// ==========================================

use crate::domain::product::SupplierInfoValues;
use crate::domain::record::{field_text, non_blank};
use crate::domain::types::ModelName;
use crate::importer::batch_importer::run_direct;
use crate::importer::context::ImportContext;
use crate::importer::dependency::{import_and_resolve, import_record, RecordImporter};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::pricing::parse_price;
use crate::remote::filters;
use async_trait::async_trait;
use serde_json::Value;
use tracing::instrument;

pub struct SupplierImporter;

#[async_trait]
impl RecordImporter for SupplierImporter {
    fn model(&self) -> ModelName {
        ModelName::Supplier
    }

    async fn run(
        &self,
        ctx: &ImportContext,
        remote_id: &str,
        record: Option<Value>,
    ) -> ImportResult<()> {
        let record = match record {
            Some(record) if record.get("name").is_some() => record,
            _ => ctx.adapter().read(self.model().resource(), remote_id).await?,
        };
        let name = non_blank(&record, "name").unwrap_or_else(|| format!("supplier_{}", remote_id));

        let binder = ctx.binder(self.model());
        let suppliers = ctx.suppliers();
        let supplier_id = match binder.to_local(remote_id, true)? {
            Some(supplier_id) => {
                suppliers.rename_supplier(supplier_id, &name)?;
                supplier_id
            }
            None => suppliers.create_supplier(&name)?,
        };
        binder.bind(remote_id, supplier_id)?;
        Ok(())
    }
}

pub struct SupplierInfoImporter;

#[async_trait]
impl RecordImporter for SupplierInfoImporter {
    fn model(&self) -> ModelName {
        ModelName::SupplierInfo
    }

    /// 复核时总是重新读取远程记录
    async fn run(
        &self,
        ctx: &ImportContext,
        remote_id: &str,
        _record: Option<Value>,
    ) -> ImportResult<()> {
        let record = ctx.adapter().read(self.model().resource(), remote_id).await?;
        let invalid = |message: String| ImportError::InvalidRecord {
            model: ModelName::SupplierInfo,
            remote_id: remote_id.to_string(),
            message,
        };

        let product_id =
            field_text(&record, "id_product").ok_or_else(|| invalid("缺少 id_product".to_string()))?;
        let supplier_remote =
            field_text(&record, "id_supplier").ok_or_else(|| invalid("缺少 id_supplier".to_string()))?;
        let template_id = import_and_resolve(ctx, ModelName::ProductTemplate, &product_id).await?;
        let supplier_id = import_and_resolve(ctx, ModelName::Supplier, &supplier_remote).await?;

        let raw_price = field_text(&record, "product_supplier_price_te").unwrap_or_default();
        let values = SupplierInfoValues {
            template_id,
            supplier_id,
            product_code: non_blank(&record, "product_supplier_reference"),
            price: parse_price(&raw_price)
                .ok_or_else(|| invalid(format!("价格无法解析: {:?}", raw_price)))?,
        };

        let binder = ctx.binder(self.model());
        let suppliers = ctx.suppliers();
        let info_id = match binder.to_local(remote_id, true)? {
            Some(info_id) if suppliers.find_info(info_id)?.is_some() => {
                suppliers.update_info(info_id, &values)?;
                info_id
            }
            _ => suppliers.create_info(&values)?,
        };
        binder.bind(remote_id, info_id)?;
        tracing::debug!(remote_id, info_id, template_id, "供应商信息已导入");
        Ok(())
    }
}

/// 供应商信息同步
///
/// 1. 以 filter[id_product] / filter[id_product_attribute]=0 直接批量导入
/// 2. 模板下每条已绑定的供应商信息重新导入
/// 3. 远程返回不存在 → 删除本地记录及绑定
///
/// # 返回
/// - 删除的本地记录数
#[instrument(skip(ctx), fields(backend_id = ctx.backend().id))]
pub async fn import_supplierinfo(ctx: &ImportContext, product_id: &str) -> ImportResult<usize> {
    let query = filters([
        ("filter[id_product]", product_id.trim().to_string()),
        ("filter[id_product_attribute]", "0".to_string()),
    ]);
    run_direct(ctx, ModelName::SupplierInfo, &query).await?;

    let template_id = import_and_resolve(ctx, ModelName::ProductTemplate, product_id).await?;
    let binder = ctx.binder(ModelName::SupplierInfo);
    let suppliers = ctx.suppliers();

    let mut removed = 0;
    for info_id in suppliers.info_ids_for_template(template_id)? {
        for remote_id in binder.remote_ids_for_local(info_id)? {
            match import_record(ctx, ModelName::SupplierInfo, &remote_id, None).await {
                Ok(()) => {}
                Err(err) if err.is_remote_not_found() => {
                    suppliers.delete_info(info_id)?;
                    binder.unbind(&remote_id)?;
                    removed += 1;
                    tracing::info!(info_id, remote_id = %remote_id, "远程供应商信息已不存在，删除本地记录");
                }
                Err(err) => return Err(err),
            }
        }
    }
    Ok(removed)
}
