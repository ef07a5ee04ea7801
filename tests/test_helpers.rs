// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 临时数据库、测试后端、内存店铺数据、任务执行器
// ==========================================

#![allow(dead_code)]

use catalog_sync::db::{open_shared, SharedConnection};
use catalog_sync::domain::{BackendContext, NewBackend};
use catalog_sync::importer::{ExtensionRegistry, ImportContext};
use catalog_sync::jobs::{AdapterProvider, JobQueue, JobRunner};
use catalog_sync::remote::{MemoryAdapter, RemoteAdapter};
use catalog_sync::repository::BackendRepository;
use serde_json::{json, Value};
use std::error::Error;
use std::sync::Arc;
use tempfile::NamedTempFile;

/// 测试队列的最大重试次数
pub const TEST_MAX_RETRIES: i32 = 2;

/// 库存写入库位
pub const TEST_LOCATION_ID: i64 = 7;

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - SharedConnection: 共享连接
pub fn create_test_db() -> Result<(NamedTempFile, SharedConnection), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file
        .path()
        .to_str()
        .ok_or("临时文件路径不是 UTF-8")?
        .to_string();
    let conn = open_shared(&db_path)?;
    Ok((temp_file, conn))
}

/// 登记测试后端
pub fn create_backend(conn: &SharedConnection, taxes_included: bool) -> BackendContext {
    let repo = BackendRepository::from_connection(conn.clone());
    let id = repo
        .create(&NewBackend {
            name: "test-shop".to_string(),
            api_url: "http://shop.test/api".to_string(),
            api_key: "KEY".to_string(),
            company_id: 1,
            language_id: Some("1".to_string()),
            taxes_included,
            stock_location_id: TEST_LOCATION_ID,
        })
        .expect("Failed to create backend");
    repo.get(id).expect("Failed to load backend")
}

pub fn create_queue(conn: &SharedConnection) -> JobQueue {
    JobQueue::new(conn.clone(), TEST_MAX_RETRIES).expect("Failed to create queue")
}

/// 直接构建导入上下文（不经过任务队列执行）
pub fn create_context(
    conn: &SharedConnection,
    backend: &BackendContext,
    adapter: Arc<MemoryAdapter>,
) -> ImportContext {
    ImportContext::new(
        Arc::new(backend.clone()),
        conn.clone(),
        adapter,
        create_queue(conn),
        Arc::new(ExtensionRegistry::empty()),
    )
}

/// 所有后端共用同一个内存适配器
pub fn memory_provider(adapter: Arc<MemoryAdapter>) -> AdapterProvider {
    Arc::new(move |_backend: &BackendContext| Ok(adapter.clone() as Arc<dyn RemoteAdapter>))
}

pub fn create_runner(conn: &SharedConnection, adapter: Arc<MemoryAdapter>) -> JobRunner {
    JobRunner::new(
        conn.clone(),
        create_queue(conn),
        memory_provider(adapter),
        Arc::new(ExtensionRegistry::empty()),
    )
    .with_page_size(2)
}

// ==========================================
// 店铺数据
// ==========================================

/// 最简商品记录
pub fn product(id: &str, price: &str) -> Value {
    json!({
        "id": id,
        "name": {"language": [{"attrs": {"id": "1"}, "value": format!("Product {}", id)}]},
        "reference": "",
        "price": price,
        "active": "1",
        "type": {"value": "simple"},
        "id_category_default": "0",
        "id_tax_rules_group": "0",
        "date_add": "2024-01-02 03:04:05",
        "date_upd": "2024-01-02 03:04:05",
        "associations": {}
    })
}

pub fn category(id: &str, parent: &str, name: &str) -> Value {
    json!({
        "id": id,
        "id_parent": parent,
        "active": "1",
        "name": {"language": [{"attrs": {"id": "1"}, "value": name}]}
    })
}

/// 属性 “Size” 及其值
pub fn insert_size_option(adapter: &MemoryAdapter, values: &[(&str, &str)]) {
    adapter
        .insert(
            "product_options",
            json!({"id": "1", "name": {"language": [{"attrs": {"id": "1"}, "value": "Size"}]}}),
        )
        .expect("insert option");
    for (id, name) in values {
        adapter
            .insert(
                "product_option_values",
                json!({
                    "id": id,
                    "id_attribute_group": "1",
                    "name": {"language": [{"attrs": {"id": "1"}, "value": name}]}
                }),
            )
            .expect("insert option value");
    }
}

pub fn combination(id: &str, product_id: &str, option_value: &str, images: &[&str]) -> Value {
    let images: Vec<Value> = images.iter().map(|i| json!({"id": i})).collect();
    json!({
        "id": id,
        "id_product": product_id,
        "reference": format!("COMB-{}", id),
        "ean13": "",
        "price": "1.5",
        "associations": {
            "product_option_values": {"product_option_value": {"id": option_value}},
            "images": {"image": images}
        }
    })
}
