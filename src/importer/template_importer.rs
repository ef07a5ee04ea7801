// ==========================================
// 商品同步连接器 - 商品模板导入
// ==========================================
// 流程:
// 1. 读取远程记录
// 2. 导入依赖（默认分类 / 分类 / 制造商）
// 3. 映射 → 创建或更新本地模板 → 绑定
// 4. 导入后处理（顺序固定）:
//    图片任务 → 组合 → 属性行 → 停用占位变体 → 默认分类检查点
// ==========================================

use crate::domain::product::TemplateValues;
use crate::domain::record::{association, field_text, id_of, is_unset_id};
use crate::domain::types::ModelName;
use crate::importer::context::ImportContext;
use crate::importer::dependency::{import_dependency, RecordImporter};
use crate::importer::error::ImportResult;
use crate::importer::template_mapper::TemplateMapper;
use crate::jobs::job::{ConnectorJob, PRIORITY_MEDIUM, PRIORITY_PRODUCT_IMAGE};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::instrument;

/// 默认分类导入失败时的检查点消息
pub const DEFAULT_CATEGORY_MISSING: &str = "The default category could not be imported.";

pub struct TemplateImporter;

#[async_trait]
impl RecordImporter for TemplateImporter {
    fn model(&self) -> ModelName {
        ModelName::ProductTemplate
    }

    async fn run(
        &self,
        ctx: &ImportContext,
        remote_id: &str,
        record: Option<Value>,
    ) -> ImportResult<()> {
        import_template(ctx, remote_id, record).await.map(|_| ())
    }
}

/// 导入单个商品模板，返回本地模板 id
#[instrument(skip(ctx, record), fields(backend_id = ctx.backend().id))]
pub async fn import_template(
    ctx: &ImportContext,
    remote_id: &str,
    record: Option<Value>,
) -> ImportResult<i64> {
    let record = match record {
        Some(record) if record.get("associations").is_some() => record,
        _ => ctx.adapter().read(ModelName::ProductTemplate.resource(), remote_id).await?,
    };

    let default_category_error = import_dependencies(ctx, &record).await?;

    let binder = ctx.binder(ModelName::ProductTemplate);
    let bound = binder.to_local(remote_id, true)?;
    let mapped = TemplateMapper::new(ctx, &record).map(bound).await?;
    let values = TemplateValues::from_mapped(mapped)?;

    let products = ctx.products();
    let template_id = match bound.or(values.local_id) {
        Some(template_id) => {
            products.update_template(template_id, &values)?;
            template_id
        }
        None => products.create_template(&values)?,
    };
    binder.bind(remote_id, template_id)?;
    tracing::info!(
        remote_id,
        template_id,
        created = bound.is_none(),
        "商品模板已导入"
    );

    after_import(ctx, &record, template_id, default_category_error).await?;
    Ok(template_id)
}

// ==========================================
// 依赖
// ==========================================

/// 导入依赖；返回默认分类是否因远程服务错误而导入失败
async fn import_dependencies(ctx: &ImportContext, record: &Value) -> ImportResult<bool> {
    let mut default_category_error = false;

    let default_category = field_text(record, "id_category_default");
    if !is_unset_id(default_category.as_deref()) {
        let category_id = default_category.unwrap_or_default();
        match import_dependency(ctx, ModelName::ProductCategory, &category_id, false).await {
            Ok(()) => {}
            Err(err) if err.is_remote_service_error() => {
                tracing::warn!(category_id = %category_id, error = %err, "默认分类导入失败，继续导入商品");
                default_category_error = true;
            }
            Err(err) => return Err(err),
        }
    }

    for category in association(record, "categories", "category") {
        if let Some(category_id) = id_of(&category) {
            import_dependency(ctx, ModelName::ProductCategory, &category_id, false).await?;
        }
    }

    ctx.extensions().manufacturer().import(ctx, record).await?;
    Ok(default_category_error)
}

// ==========================================
// 导入后处理
// ==========================================

async fn after_import(
    ctx: &ImportContext,
    record: &Value,
    template_id: i64,
    default_category_error: bool,
) -> ImportResult<()> {
    let image_count = import_images(ctx, record)?;
    import_combinations(ctx, record, image_count > 0).await?;
    attribute_line(ctx, template_id)?;
    deactivate_default_product(ctx, template_id)?;
    if default_category_error {
        checkpoint_default_category_missing(ctx, template_id)?;
    }
    Ok(())
}

/// 每张图片一个导入任务；返回图片数
fn import_images(ctx: &ImportContext, record: &Value) -> ImportResult<usize> {
    let product_id = field_text(record, "id").unwrap_or_default();
    let mut count = 0;
    for image in association(record, "images", "image") {
        let Some(image_id) = id_of(&image) else {
            continue;
        };
        ctx.enqueue(
            &ConnectorJob::ImportProductImage {
                product_id: product_id.clone(),
                image_id,
            },
            PRIORITY_PRODUCT_IMAGE,
        )?;
        count += 1;
    }
    Ok(count)
}

/// 组合导入顺序: 默认组合在前，其余保持原顺序
pub fn combination_order(record: &Value) -> (Option<String>, Vec<String>) {
    let mut combinations: Vec<String> = association(record, "combinations", "combination")
        .iter()
        .filter_map(id_of)
        .collect();
    let default_id = field_text(record, "id_default_combination");
    let position = default_id
        .as_deref()
        .and_then(|id| combinations.iter().position(|c| c == id.trim()));
    match position {
        Some(position) => {
            let first = combinations.remove(position);
            (Some(first), combinations)
        }
        None => (None, combinations),
    }
}

async fn import_combinations(ctx: &ImportContext, record: &Value, has_images: bool) -> ImportResult<()> {
    let (default, others) = combination_order(record);

    if let Some(default) = &default {
        import_dependency(ctx, ModelName::ProductCombination, default, true).await?;
    }
    for combination in &others {
        import_dependency(ctx, ModelName::ProductCombination, combination, true).await?;
    }

    if !others.is_empty() && has_images {
        ctx.enqueue(
            &ConnectorJob::SetProductImageVariant {
                combinations: others,
            },
            PRIORITY_MEDIUM,
        )?;
    }
    Ok(())
}

/// 为变体使用的属性值补齐模板属性行
fn attribute_line(ctx: &ImportContext, template_id: i64) -> ImportResult<()> {
    let products = ctx.products();
    let lines = products.attribute_lines(template_id)?;
    let declared: Vec<i64> = lines.iter().flat_map(|l| l.value_ids.iter().copied()).collect();

    // attribute_id → 未声明的值（保持首次出现顺序）
    let mut pending: BTreeMap<i64, Vec<i64>> = BTreeMap::new();
    for variant in products.list_variants(template_id)? {
        for value in variant.attribute_values {
            if declared.contains(&value.value_id) {
                continue;
            }
            let values = pending.entry(value.attribute_id).or_default();
            if !values.contains(&value.value_id) {
                values.push(value.value_id);
            }
        }
    }

    for (attribute_id, value_ids) in pending {
        match lines.iter().find(|l| l.attribute_id == attribute_id) {
            Some(line) => products.add_attribute_line_values(line.id, &value_ids)?,
            None => {
                products.create_attribute_line(template_id, attribute_id, &value_ids)?;
            }
        }
        tracing::debug!(template_id, attribute_id, values = value_ids.len(), "属性行已更新");
    }
    Ok(())
}

/// 存在多个变体时，停用无属性值的变体
fn deactivate_default_product(ctx: &ImportContext, template_id: i64) -> ImportResult<()> {
    let products = ctx.products();
    let variants = products.list_variants(template_id)?;
    if variants.len() <= 1 {
        return Ok(());
    }
    for variant in variants.iter().filter(|v| v.attribute_values.is_empty() && v.active) {
        products.set_variant_active(variant.id, false)?;
        tracing::debug!(template_id, variant_id = variant.id, "占位变体已停用");
    }
    Ok(())
}

fn checkpoint_default_category_missing(ctx: &ImportContext, template_id: i64) -> ImportResult<()> {
    let checkpoint_id = ctx.checkpoints().add(
        ctx.backend().id,
        ModelName::ProductTemplate,
        template_id,
        DEFAULT_CATEGORY_MISSING,
    )?;
    tracing::warn!(template_id, checkpoint_id, "已记录检查点: 默认分类缺失");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_combination_order_default_first() {
        let record = json!({
            "id_default_combination": {"value": "12"},
            "associations": {"combinations": {"combination": [
                {"id": "11"}, {"id": "12"}, {"id": "13"}
            ]}}
        });
        let (default, others) = combination_order(&record);
        assert_eq!(default.as_deref(), Some("12"));
        assert_eq!(others, vec!["11", "13"]);
    }

    #[test]
    fn test_combination_order_single_object_and_missing_default() {
        let single = json!({
            "id_default_combination": "7",
            "associations": {"combinations": {"combination": {"id": "7"}}}
        });
        assert_eq!(combination_order(&single), (Some("7".to_string()), vec![]));

        let missing = json!({
            "id_default_combination": "0",
            "associations": {"combinations": [{"id": "3"}, {"id": "4"}]}
        });
        assert_eq!(
            combination_order(&missing),
            (None, vec!["3".to_string(), "4".to_string()])
        );
    }
}
