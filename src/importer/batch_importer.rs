// ==========================================
// 商品同步连接器 - 批量导入
// ==========================================
// run_delayed: 分页搜索，每条记录提交一个导入任务
// run_direct:  分页搜索，在当前任务内逐条导入
// import_products: 增量导入分类与商品，并记录本次导入时间
// ==========================================

use crate::domain::record::id_of;
use crate::domain::types::ModelName;
use crate::importer::context::ImportContext;
use crate::importer::dependency::import_record;
use crate::importer::error::ImportResult;
use crate::jobs::job::{ConnectorJob, PRIORITY_MEDIUM};
use crate::remote::Filters;
use chrono::Utc;
use tracing::instrument;

/// 分页搜索全部匹配记录的 id
async fn search_ids(ctx: &ImportContext, model: ModelName, filters: &Filters) -> ImportResult<Vec<String>> {
    let page_size = ctx.page_size();
    let mut offset = 0usize;
    let mut ids = Vec::new();

    loop {
        let mut query = filters.clone();
        query.insert("limit".to_string(), format!("{},{}", offset, page_size));
        let page = ctx.adapter().search(model.resource(), &query).await?;
        ids.extend(page.iter().filter_map(id_of));

        if page.len() < page_size {
            break;
        }
        offset += page_size;
    }
    Ok(ids)
}

/// 提交单条导入任务，返回提交数
#[instrument(skip(ctx, filters), fields(backend_id = ctx.backend().id, model = %model))]
pub async fn run_delayed(
    ctx: &ImportContext,
    model: ModelName,
    filters: &Filters,
    priority: i32,
) -> ImportResult<usize> {
    let ids = search_ids(ctx, model, filters).await?;
    for remote_id in &ids {
        ctx.enqueue(
            &ConnectorJob::ImportRecord {
                model,
                remote_id: remote_id.clone(),
                record: None,
            },
            priority,
        )?;
    }
    tracing::info!(count = ids.len(), "批量导入任务已提交");
    Ok(ids.len())
}

/// 在当前任务内逐条导入，返回导入数
#[instrument(skip(ctx, filters), fields(backend_id = ctx.backend().id, model = %model))]
pub async fn run_direct(ctx: &ImportContext, model: ModelName, filters: &Filters) -> ImportResult<usize> {
    let ids = search_ids(ctx, model, filters).await?;
    for remote_id in &ids {
        import_record(ctx, model, remote_id, None).await?;
    }
    tracing::info!(count = ids.len(), "批量导入完成");
    Ok(ids.len())
}

/// 增量导入分类与商品
///
/// # 参数
/// - since: 只导入该时间之后更新的记录；None 表示全部
#[instrument(skip(ctx), fields(backend_id = ctx.backend().id))]
pub async fn import_products(ctx: &ImportContext, since: Option<&str>) -> ImportResult<usize> {
    let started_at = Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();

    let mut query = Filters::new();
    if let Some(since) = since.map(str::trim).filter(|s| !s.is_empty()) {
        query.insert("date".to_string(), "1".to_string());
        query.insert("filter[date_upd]".to_string(), format!(">[{}]", since));
    }

    let categories = run_delayed(ctx, ModelName::ProductCategory, &query, PRIORITY_MEDIUM).await?;
    let templates = run_delayed(ctx, ModelName::ProductTemplate, &query, PRIORITY_MEDIUM).await?;

    ctx.backends()
        .set_import_products_since(ctx.backend().id, &started_at)?;
    tracing::info!(categories, templates, since = %started_at, "增量导入已提交");
    Ok(categories + templates)
}
