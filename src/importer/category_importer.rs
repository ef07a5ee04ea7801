// ==========================================
// 商品同步连接器 - 分类导入
// ==========================================
// 父分类先于子分类导入（id_parent 为 0 表示根）
// ==========================================

use crate::domain::record::{field_text, flag, is_unset_id, translated_field};
use crate::domain::types::ModelName;
use crate::importer::context::ImportContext;
use crate::importer::dependency::{import_dependency, RecordImporter};
use crate::importer::error::ImportResult;
use crate::repository::CategoryValues;
use async_trait::async_trait;
use serde_json::Value;

pub struct CategoryImporter;

#[async_trait]
impl RecordImporter for CategoryImporter {
    fn model(&self) -> ModelName {
        ModelName::ProductCategory
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
        let binder = ctx.binder(self.model());

        let parent_remote = field_text(&record, "id_parent");
        let parent_id = if is_unset_id(parent_remote.as_deref()) {
            None
        } else {
            let parent_remote = parent_remote.unwrap_or_default();
            import_dependency(ctx, self.model(), &parent_remote, false).await?;
            binder.to_local(&parent_remote, true)?
        };

        let name = translated_field(&record, "name", ctx.backend().language_id.as_deref())
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| format!("category_{}", remote_id));
        let values = CategoryValues {
            name,
            parent_id,
            active: record.get("active").map_or(true, |_| flag(&record, "active")),
        };

        let categories = ctx.categories();
        let category_id = match binder.to_local(remote_id, true)? {
            Some(category_id) => {
                categories.update(category_id, &values)?;
                category_id
            }
            None => categories.create(&values)?,
        };
        binder.bind(remote_id, category_id)?;
        tracing::debug!(remote_id, category_id, "分类已导入");
        Ok(())
    }
}
