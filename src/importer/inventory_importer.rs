// ==========================================
// 商品同步连接器 - 库存同步
// ==========================================
// 批量: 列出 stock_availables 摘要，每条提交一个单条导入任务
// 单条: 键为 (id_product, id_product_attribute)，"0" 表示无变体
// - 汇总全部仓库条目数量，负数按 0
// - 以绝对数量写入后端配置的库位
// ==========================================

use crate::domain::record::{field_text, RemoteRecord};
use crate::domain::types::ModelName;
use crate::importer::context::ImportContext;
use crate::importer::dependency::{import_and_resolve, RecordImporter};
use crate::importer::error::{ImportError, ImportResult};
use crate::jobs::job::{ConnectorJob, PRIORITY_DEFAULT};
use crate::remote::{filters, unwrap_listing};
use async_trait::async_trait;
use serde_json::Value;
use tracing::instrument;

const RESOURCE: &str = "stock_availables";

/// 批量导入库存: 提交单条任务，返回提交数
#[instrument(skip(ctx), fields(backend_id = ctx.backend().id))]
pub async fn import_inventory(ctx: &ImportContext) -> ImportResult<usize> {
    let page_size = ctx.page_size();
    let mut offset = 0usize;
    let mut submitted = 0usize;

    loop {
        let query = filters([
            ("display", "[id,id_product,id_product_attribute]".to_string()),
            ("limit", format!("{},{}", offset, page_size)),
        ]);
        let body = ctx.adapter().get(RESOURCE, &query).await?;
        let page = unwrap_listing(&body, RESOURCE);

        for entry in &page {
            let Some(remote_id) = field_text(entry, "id") else {
                continue;
            };
            ctx.enqueue(
                &ConnectorJob::ImportRecord {
                    model: ModelName::StockAvailable,
                    remote_id,
                    record: Some(entry.clone()),
                },
                PRIORITY_DEFAULT,
            )?;
            submitted += 1;
        }

        if page.len() < page_size {
            break;
        }
        offset += page_size;
    }

    tracing::info!(submitted, "库存导入任务已提交");
    Ok(submitted)
}

/// 汇总 (商品, 变体) 的库存数量
pub async fn fetch_quantity(
    ctx: &ImportContext,
    product_id: &str,
    product_attribute_id: &str,
) -> ImportResult<i64> {
    let query = filters([
        ("filter[id_product]", product_id.to_string()),
        ("filter[id_product_attribute]", product_attribute_id.to_string()),
        ("display", "[quantity]".to_string()),
    ]);
    let body = ctx.adapter().get(RESOURCE, &query).await?;
    sum_quantities(&unwrap_listing(&body, RESOURCE))
}

/// 数量求和（未 clamp）
pub fn sum_quantities(entries: &[RemoteRecord]) -> ImportResult<i64> {
    entries.iter().try_fold(0i64, |total, entry| {
        let raw = field_text(entry, "quantity").unwrap_or_default();
        let quantity = raw.trim().parse::<i64>().map_err(|_| ImportError::InvalidRecord {
            model: ModelName::StockAvailable,
            remote_id: field_text(entry, "id").unwrap_or_default(),
            message: format!("库存数量无法解析: {:?}", raw),
        })?;
        Ok(total + quantity)
    })
}

pub struct InventoryRecordImporter;

#[async_trait]
impl RecordImporter for InventoryRecordImporter {
    fn model(&self) -> ModelName {
        ModelName::StockAvailable
    }

    async fn run(
        &self,
        ctx: &ImportContext,
        remote_id: &str,
        record: Option<Value>,
    ) -> ImportResult<()> {
        let record = match record {
            Some(record) if record.get("id_product").is_some() => record,
            _ => ctx.adapter().read(RESOURCE, remote_id).await?,
        };
        let product_id = field_text(&record, "id_product").ok_or_else(|| ImportError::InvalidRecord {
            model: ModelName::StockAvailable,
            remote_id: remote_id.to_string(),
            message: "缺少 id_product".to_string(),
        })?;
        let attribute_id = field_text(&record, "id_product_attribute")
            .map(|a| a.trim().to_string())
            .unwrap_or_else(|| "0".to_string());

        let template_id = import_and_resolve(ctx, ModelName::ProductTemplate, &product_id).await?;
        let variant_ids: Vec<i64> = if attribute_id == "0" {
            ctx.products()
                .list_variants(template_id)?
                .into_iter()
                .filter(|v| v.active)
                .map(|v| v.id)
                .collect()
        } else {
            vec![import_and_resolve(ctx, ModelName::ProductCombination, &attribute_id).await?]
        };

        let total = fetch_quantity(ctx, &product_id, &attribute_id).await?;
        let quantity = total.max(0) as f64;

        let location_id = ctx.backend().stock_location_id;
        let stock = ctx.stock();
        for variant_id in &variant_ids {
            stock.set_quantity(*variant_id, location_id, quantity)?;
        }
        tracing::info!(
            product_id = %product_id,
            attribute_id = %attribute_id,
            total,
            quantity,
            variants = variant_ids.len(),
            "库存已同步"
        );
        Ok(())
    }
}
