// ==========================================
// 商品同步连接器 - 远程接口层
// ==========================================
// 职责: 定义远程 Web Service 适配器接口
// 实现:
// - HttpAdapter: reqwest 访问真实店铺
// - MemoryAdapter: 进程内数据（离线演练/测试）
// ==========================================

pub mod error;
pub mod http_adapter;
pub mod memory_adapter;

pub use error::{RemoteError, RemoteResult};
pub use http_adapter::HttpAdapter;
pub use memory_adapter::MemoryAdapter;

use crate::domain::record::ensure_list;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;

/// 查询参数（filter[...] / display / limit / date / sort）
pub type Filters = BTreeMap<String, String>;

/// 二进制资源（图片）
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryContent {
    pub content: Vec<u8>,
    pub content_type: Option<String>,
}

// ==========================================
// RemoteAdapter - 远程适配器 trait
// ==========================================
#[async_trait]
pub trait RemoteAdapter: Send + Sync {
    /// 读取单条记录（已去除 {"product": {...}} 包装）
    async fn read(&self, resource: &str, id: &str) -> RemoteResult<Value>;

    /// 列表查询，返回原始响应（以资源名包装）
    async fn get(&self, resource: &str, filters: &Filters) -> RemoteResult<Value>;

    /// 列表查询，返回摘要记录列表
    async fn search(&self, resource: &str, filters: &Filters) -> RemoteResult<Vec<Value>> {
        let body = self.get(resource, filters).await?;
        Ok(unwrap_listing(&body, resource))
    }

    /// 读取二进制资源（如 images/products/<product>/<image>）
    async fn read_binary(&self, path: &str) -> RemoteResult<BinaryContent>;
}

/// 去除单条记录的节点包装
pub fn unwrap_record(body: Value) -> Value {
    match body {
        Value::Object(mut map) if map.len() == 1 => {
            let key = map.keys().next().cloned().unwrap_or_default();
            match map.remove(&key) {
                Some(inner @ Value::Object(_)) => inner,
                Some(other) => {
                    map.insert(key, other);
                    Value::Object(map)
                }
                None => Value::Object(map),
            }
        }
        other => other,
    }
}

/// 从列表响应中取出记录
///
/// 兼容以下形态:
/// - `{"stock_availables": [..]}`
/// - `{"stock_availables": {"stock_available": [..]}}`
/// - `{"stock_availables": {"stock_available": {..}}}`（基数为 1）
/// - `{"stock_availables": {"id": ..}}`（基数为 1，无节点包装）
/// - `{"stock_availables": {"quantity": ..}}`（display 只取一个字段）
/// - `[]`（无结果）
///
/// 只有唯一键等于单数节点名时才视为节点包装
pub fn unwrap_listing(body: &Value, resource: &str) -> Vec<Value> {
    let Some(inner) = body.get(resource) else {
        return Vec::new();
    };
    let node = node_name(resource);
    match inner {
        Value::Object(map) if map.len() == 1 && map.contains_key(&node) => ensure_list(map.get(&node)),
        other => ensure_list(Some(other)),
    }
}

/// 资源名的单数节点名（categories → category，stock_availables → stock_available）
pub fn node_name(resource: &str) -> String {
    if let Some(stem) = resource.strip_suffix("ies") {
        format!("{}y", stem)
    } else {
        resource.strip_suffix('s').unwrap_or(resource).to_string()
    }
}

/// 构造查询参数
pub fn filters<I, K, V>(pairs: I) -> Filters
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
