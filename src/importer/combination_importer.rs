// ==========================================
// 商品同步连接器 - 组合导入
// ==========================================
// 组合 → 本地变体（属性值 + 编码 + 条码 + 价差）
// 依赖: 所属模板、组合引用的属性值
// ==========================================

use crate::domain::product::VariantValues;
use crate::domain::record::{association, field_text, id_of, non_blank};
use crate::domain::types::ModelName;
use crate::importer::barcode::check_ean;
use crate::importer::context::ImportContext;
use crate::importer::dependency::{import_and_resolve, RecordImporter};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::pricing::parse_price;
use async_trait::async_trait;
use serde_json::Value;

pub struct CombinationImporter;

#[async_trait]
impl RecordImporter for CombinationImporter {
    fn model(&self) -> ModelName {
        ModelName::ProductCombination
    }

    async fn run(
        &self,
        ctx: &ImportContext,
        remote_id: &str,
        record: Option<Value>,
    ) -> ImportResult<()> {
        let record = match record {
            Some(record) => record,
            None => ctx.adapter().read(self.model().resource(), remote_id).await?,
        };
        let invalid = |message: &str| ImportError::InvalidRecord {
            model: ModelName::ProductCombination,
            remote_id: remote_id.to_string(),
            message: message.to_string(),
        };

        let product_id = field_text(&record, "id_product").ok_or_else(|| invalid("缺少 id_product"))?;
        let template_id = import_and_resolve(ctx, ModelName::ProductTemplate, &product_id).await?;

        let mut value_ids = Vec::new();
        for option_value in association(&record, "product_option_values", "product_option_value") {
            if let Some(value_remote_id) = id_of(&option_value) {
                let value_id =
                    import_and_resolve(ctx, ModelName::ProductOptionValue, &value_remote_id).await?;
                value_ids.push(value_id);
            }
        }

        let raw_price = field_text(&record, "price").unwrap_or_default();
        let values = VariantValues {
            template_id,
            default_code: non_blank(&record, "reference"),
            barcode: non_blank(&record, "ean13").filter(|code| check_ean(code)),
            price_extra: parse_price(&raw_price).ok_or_else(|| invalid("价格无法解析"))?,
            active: true,
        };

        let binder = ctx.binder(self.model());
        let products = ctx.products();
        let variant_id = match binder.to_local(remote_id, true)? {
            Some(variant_id) => {
                products.update_variant(variant_id, &values)?;
                variant_id
            }
            None => products.create_variant(&values)?,
        };
        products.set_variant_attribute_values(variant_id, &value_ids)?;
        binder.bind(remote_id, variant_id)?;

        tracing::info!(
            remote_id,
            template_id,
            variant_id,
            attribute_values = value_ids.len(),
            "组合已导入"
        );
        Ok(())
    }
}
