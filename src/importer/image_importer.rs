// ==========================================
// 商品同步连接器 - 图片导入
// ==========================================
// import_product_image: 下载单张商品图片并绑定 (product.image, image_id)
// set_product_image_variant: 按组合的图片关联设置变体图片
// ==========================================

use crate::domain::record::{association, id_of};
use crate::domain::types::ModelName;
use crate::importer::context::ImportContext;
use crate::importer::dependency::import_and_resolve;
use crate::importer::error::ImportResult;
use crate::repository::ImageValues;
use tracing::instrument;

/// 导入商品图片，返回本地图片 id
#[instrument(skip(ctx), fields(backend_id = ctx.backend().id))]
pub async fn import_product_image(
    ctx: &ImportContext,
    product_id: &str,
    image_id: &str,
) -> ImportResult<i64> {
    let template_id = import_and_resolve(ctx, ModelName::ProductTemplate, product_id).await?;

    let path = format!("images/products/{}/{}", product_id.trim(), image_id.trim());
    let binary = ctx.adapter().read_binary(&path).await?;
    let values = ImageValues {
        template_id,
        file_name: format!("product_{}_{}", product_id.trim(), image_id.trim()),
        content_type: binary.content_type,
        content: binary.content,
    };

    let binder = ctx.binder(ModelName::ProductImage);
    let images = ctx.images();
    let local_id = match binder.to_local(image_id, true)? {
        Some(local_id) => {
            images.update(local_id, &values)?;
            local_id
        }
        None => images.create(&values)?,
    };
    binder.bind(image_id, local_id)?;
    tracing::info!(template_id, local_id, bytes = values.content.len(), "商品图片已导入");
    Ok(local_id)
}

/// 设置组合对应变体的图片
#[instrument(skip(ctx), fields(backend_id = ctx.backend().id))]
pub async fn set_product_image_variant(
    ctx: &ImportContext,
    combinations: &[String],
) -> ImportResult<()> {
    let image_binder = ctx.binder(ModelName::ProductImage);
    let images = ctx.images();

    for combination_id in combinations {
        let variant_id =
            import_and_resolve(ctx, ModelName::ProductCombination, combination_id).await?;
        let record = ctx
            .adapter()
            .read(ModelName::ProductCombination.resource(), combination_id)
            .await?;

        let mut image_ids = Vec::new();
        for image in association(&record, "images", "image") {
            let Some(remote_image) = id_of(&image) else {
                continue;
            };
            // 未导入的图片跳过
            if let Some(local_id) = image_binder.to_local(&remote_image, true)? {
                image_ids.push(local_id);
            }
        }
        images.set_variant_images(variant_id, &image_ids)?;
        tracing::debug!(combination_id = %combination_id, variant_id, images = image_ids.len(), "变体图片已设置");
    }
    Ok(())
}
