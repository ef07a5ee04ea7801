// ==========================================
// 商品同步连接器 - 属性导入
// ==========================================
// product_options        → product_attribute
// product_option_values  → product_attribute_value（先导入所属属性）
// ==========================================

use crate::domain::record::{field_text, translated_field};
use crate::domain::types::ModelName;
use crate::importer::context::ImportContext;
use crate::importer::dependency::{import_and_resolve, RecordImporter};
use crate::importer::error::{ImportError, ImportResult};
use async_trait::async_trait;
use serde_json::Value;

pub struct OptionImporter;

#[async_trait]
impl RecordImporter for OptionImporter {
    fn model(&self) -> ModelName {
        ModelName::ProductOption
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
        let name = option_name(ctx, &record, self.model(), remote_id)?;

        let binder = ctx.binder(self.model());
        let attributes = ctx.attributes();
        let attribute_id = match binder.to_local(remote_id, true)? {
            Some(attribute_id) => {
                attributes.rename_attribute(attribute_id, &name)?;
                attribute_id
            }
            None => attributes.create_attribute(&name)?,
        };
        binder.bind(remote_id, attribute_id)?;
        tracing::debug!(remote_id, attribute_id, name = %name, "属性已导入");
        Ok(())
    }
}

pub struct OptionValueImporter;

#[async_trait]
impl RecordImporter for OptionValueImporter {
    fn model(&self) -> ModelName {
        ModelName::ProductOptionValue
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

        let group = field_text(&record, "id_attribute_group").ok_or_else(|| {
            ImportError::InvalidRecord {
                model: self.model(),
                remote_id: remote_id.to_string(),
                message: "缺少 id_attribute_group".to_string(),
            }
        })?;
        let attribute_id = import_and_resolve(ctx, ModelName::ProductOption, &group).await?;
        let name = option_name(ctx, &record, self.model(), remote_id)?;

        let binder = ctx.binder(self.model());
        let attributes = ctx.attributes();
        let value_id = match binder.to_local(remote_id, true)? {
            Some(value_id) => {
                attributes.update_value(value_id, attribute_id, &name)?;
                value_id
            }
            None => attributes.create_value(attribute_id, &name)?,
        };
        binder.bind(remote_id, value_id)?;
        tracing::debug!(remote_id, value_id, attribute_id, "属性值已导入");
        Ok(())
    }
}

fn option_name(
    ctx: &ImportContext,
    record: &Value,
    model: ModelName,
    remote_id: &str,
) -> ImportResult<String> {
    translated_field(record, "name", ctx.backend().language_id.as_deref())
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ImportError::InvalidRecord {
            model,
            remote_id: remote_id.to_string(),
            message: "名称为空".to_string(),
        })
}
