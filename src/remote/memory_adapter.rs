// ==========================================
// 商品同步连接器 - 内存适配器
// ==========================================
// 职责: 以进程内数据模拟店铺 Web Service
// 支持的过滤语法:
// - filter[x]=v        精确匹配
// - filter[x]=[a|b]    集合匹配
// - filter[x]=>[v]     大于（字符串比较，用于日期）
// - limit=offset,count 或 limit=count
// - display=[a,b]      只返回所列字段（display=full 或缺省时返回完整记录）
// ==========================================

use crate::domain::record::field_text;
use crate::remote::error::{RemoteError, RemoteResult};
use crate::remote::{BinaryContent, Filters, RemoteAdapter};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

/// 注入的读取失败
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectedFailure {
    NotFound,
    Service(u16),
    Transport,
}

#[derive(Default)]
struct MemoryStore {
    // resource → (数值 id 排序键, id) → record
    records: BTreeMap<String, BTreeMap<(i64, String), Value>>,
    binaries: HashMap<String, BinaryContent>,
    failures: HashMap<(String, String), InjectedFailure>,
    reads: Vec<(String, String)>,
    gets: Vec<(String, Filters)>,
}

#[derive(Default)]
pub struct MemoryAdapter {
    store: Mutex<MemoryStore>,
    /// 基数为 1 的列表以裸对象返回
    single_object_listings: bool,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 列表只有一条时返回裸对象而非列表
    pub fn with_single_object_listings(mut self) -> Self {
        self.single_object_listings = true;
        self
    }

    fn lock(&self) -> RemoteResult<std::sync::MutexGuard<'_, MemoryStore>> {
        self.store
            .lock()
            .map_err(|e| RemoteError::Transport(format!("内存数据锁获取失败: {}", e)))
    }

    /// 写入（或覆盖）记录；记录必须含 id
    pub fn insert(&self, resource: &str, record: Value) -> RemoteResult<()> {
        let id = field_text(&record, "id")
            .ok_or_else(|| RemoteError::Decode(format!("{} 记录缺少 id", resource)))?;
        let mut store = self.lock()?;
        store
            .records
            .entry(resource.to_string())
            .or_default()
            .insert(sort_key(&id), record);
        Ok(())
    }

    pub fn remove(&self, resource: &str, id: &str) -> RemoteResult<bool> {
        let mut store = self.lock()?;
        Ok(store
            .records
            .get_mut(resource)
            .and_then(|records| records.remove(&sort_key(id)))
            .is_some())
    }

    pub fn insert_binary(&self, path: &str, content: Vec<u8>, content_type: Option<&str>) -> RemoteResult<()> {
        let mut store = self.lock()?;
        store.binaries.insert(
            path.trim_matches('/').to_string(),
            BinaryContent {
                content,
                content_type: content_type.map(str::to_string),
            },
        );
        Ok(())
    }

    /// 令 read(resource, id) 失败
    pub fn fail_read(&self, resource: &str, id: &str, failure: InjectedFailure) -> RemoteResult<()> {
        let mut store = self.lock()?;
        store
            .failures
            .insert((resource.to_string(), id.to_string()), failure);
        Ok(())
    }

    /// read 调用记录（按调用顺序）
    pub fn read_log(&self) -> Vec<(String, String)> {
        self.lock().map(|s| s.reads.clone()).unwrap_or_default()
    }

    /// 某资源被 read 的 id 序列
    pub fn reads_of(&self, resource: &str) -> Vec<String> {
        self.read_log()
            .into_iter()
            .filter(|(r, _)| r == resource)
            .map(|(_, id)| id)
            .collect()
    }

    /// get/search 调用记录
    pub fn get_log(&self) -> Vec<(String, Filters)> {
        self.lock().map(|s| s.gets.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl RemoteAdapter for MemoryAdapter {
    async fn read(&self, resource: &str, id: &str) -> RemoteResult<Value> {
        let id = id.trim();
        let mut store = self.lock()?;
        store.reads.push((resource.to_string(), id.to_string()));

        if let Some(failure) = store.failures.get(&(resource.to_string(), id.to_string())) {
            return Err(injected_error(*failure, resource, id));
        }

        store
            .records
            .get(resource)
            .and_then(|records| records.get(&sort_key(id)))
            .cloned()
            .ok_or_else(|| RemoteError::NotFound {
                resource: resource.to_string(),
                id: id.to_string(),
            })
    }

    async fn get(&self, resource: &str, filters: &Filters) -> RemoteResult<Value> {
        let mut store = self.lock()?;
        store.gets.push((resource.to_string(), filters.clone()));

        let mut matched: Vec<Value> = store
            .records
            .get(resource)
            .map(|records| {
                records
                    .values()
                    .filter(|record| matches_filters(record, filters))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(limit) = filters.get("limit") {
            let (offset, count) = parse_limit(limit);
            matched = matched.into_iter().skip(offset).take(count).collect();
        }

        if let Some(fields) = filters.get("display").and_then(|d| display_fields(d)) {
            matched = matched.iter().map(|record| project(record, &fields)).collect();
        }

        if matched.is_empty() {
            return Ok(Value::Array(Vec::new()));
        }
        let listing = if self.single_object_listings && matched.len() == 1 {
            matched.remove(0)
        } else {
            Value::Array(matched)
        };
        let mut body = serde_json::Map::new();
        body.insert(resource.to_string(), listing);
        Ok(Value::Object(body))
    }

    async fn read_binary(&self, path: &str) -> RemoteResult<BinaryContent> {
        let store = self.lock()?;
        let key = path.trim_matches('/');
        store.binaries.get(key).cloned().ok_or_else(|| RemoteError::NotFound {
            resource: key.to_string(),
            id: String::new(),
        })
    }
}

fn sort_key(id: &str) -> (i64, String) {
    let id = id.trim();
    (id.parse::<i64>().unwrap_or(i64::MAX), id.to_string())
}

fn injected_error(failure: InjectedFailure, resource: &str, id: &str) -> RemoteError {
    match failure {
        InjectedFailure::NotFound => RemoteError::NotFound {
            resource: resource.to_string(),
            id: id.to_string(),
        },
        InjectedFailure::Service(status) => RemoteError::Service {
            status,
            message: format!("injected failure for {}/{}", resource, id),
        },
        InjectedFailure::Transport => RemoteError::Transport("connection reset".to_string()),
    }
}

fn matches_filters(record: &Value, filters: &Filters) -> bool {
    filters.iter().all(|(key, expected)| {
        let Some(field) = key.strip_prefix("filter[").and_then(|k| k.strip_suffix(']')) else {
            return true;
        };
        let actual = field_text(record, field).unwrap_or_default();
        if let Some(bound) = expected.strip_prefix(">[").and_then(|v| v.strip_suffix(']')) {
            return actual.as_str() > bound;
        }
        if let Some(set) = expected.strip_prefix('[').and_then(|v| v.strip_suffix(']')) {
            return set.split('|').any(|candidate| candidate.trim() == actual);
        }
        actual == *expected
    })
}

/// 解析 display=[a,b]；full 返回 None
fn display_fields(display: &str) -> Option<Vec<String>> {
    let list = display.trim().strip_prefix('[')?.strip_suffix(']')?;
    Some(
        list.split(',')
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .collect(),
    )
}

fn project(record: &Value, fields: &[String]) -> Value {
    let projected: serde_json::Map<String, Value> = fields
        .iter()
        .filter_map(|field| record.get(field).map(|v| (field.clone(), v.clone())))
        .collect();
    Value::Object(projected)
}

fn parse_limit(limit: &str) -> (usize, usize) {
    match limit.split_once(',') {
        Some((offset, count)) => (
            offset.trim().parse().unwrap_or(0),
            count.trim().parse().unwrap_or(usize::MAX),
        ),
        None => (0, limit.trim().parse().unwrap_or(usize::MAX)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{filters, unwrap_listing};
    use serde_json::json;

    #[tokio::test]
    async fn test_filters_and_limit() {
        let adapter = MemoryAdapter::new();
        for (id, product) in [("1", "5"), ("2", "5"), ("3", "6"), ("10", "5")] {
            adapter
                .insert("stock_availables", json!({"id": id, "id_product": product}))
                .unwrap();
        }

        let body = adapter
            .get("stock_availables", &filters([("filter[id_product]", "5")]))
            .await
            .unwrap();
        let ids: Vec<_> = unwrap_listing(&body, "stock_availables")
            .iter()
            .filter_map(|r| field_text(r, "id"))
            .collect();
        assert_eq!(ids, vec!["1", "2", "10"]);

        let page = adapter
            .search("stock_availables", &filters([("limit", "1,2")]))
            .await
            .unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(field_text(&page[0], "id").as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_display_projects_fields() {
        let adapter = MemoryAdapter::new().with_single_object_listings();
        adapter
            .insert(
                "stock_availables",
                json!({"id": "40", "id_product": "5", "quantity": "-5"}),
            )
            .unwrap();

        let body = adapter
            .get(
                "stock_availables",
                &filters([("filter[id_product]", "5"), ("display", "[quantity]")]),
            )
            .await
            .unwrap();
        assert_eq!(body, json!({"stock_availables": {"quantity": "-5"}}));

        let full = adapter
            .search("stock_availables", &filters([("display", "full")]))
            .await
            .unwrap();
        assert_eq!(field_text(&full[0], "id_product").as_deref(), Some("5"));
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let adapter = MemoryAdapter::new();
        adapter.insert("categories", json!({"id": "3"})).unwrap();
        adapter
            .fail_read("categories", "3", InjectedFailure::Service(500))
            .unwrap();

        let err = adapter.read("categories", "3").await.unwrap_err();
        assert!(err.is_service_error());
        assert!(adapter.read("categories", "4").await.unwrap_err().is_not_found());
        assert_eq!(adapter.reads_of("categories"), vec!["3", "4"]);
    }

    #[tokio::test]
    async fn test_date_filter() {
        let adapter = MemoryAdapter::new();
        adapter
            .insert("products", json!({"id": "1", "date_upd": "2024-01-01 00:00:00"}))
            .unwrap();
        adapter
            .insert("products", json!({"id": "2", "date_upd": "2024-03-01 00:00:00"}))
            .unwrap();

        let found = adapter
            .search(
                "products",
                &filters([("filter[date_upd]", ">[2024-02-01 00:00:00]"), ("date", "1")]),
            )
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
    }
}
