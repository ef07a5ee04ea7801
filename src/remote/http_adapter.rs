// ==========================================
// 商品同步连接器 - HTTP 适配器
// ==========================================
// 协议: GET <api_url>/<resource>[/<id>]?output_format=JSON&...
// 认证: Basic Auth（用户名为 API key，密码为空）
// ==========================================

use crate::remote::error::{RemoteError, RemoteResult};
use crate::remote::{unwrap_record, BinaryContent, Filters, RemoteAdapter};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use std::time::Duration;

/// 错误响应正文在日志/错误中保留的最大长度
const MAX_ERROR_BODY: usize = 512;

#[derive(Clone)]
pub struct HttpAdapter {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpAdapter {
    /// 创建适配器
    ///
    /// # 参数
    /// - api_url: 店铺 Web Service 根地址（如 https://shop/api）
    /// - api_key: Web Service key
    /// - timeout_ms: 单次请求超时
    /// - user_agent: 请求头 User-Agent
    pub fn new(api_url: &str, api_key: &str, timeout_ms: u64, user_agent: &str) -> RemoteResult<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| RemoteError::Client(e.to_string()))?;
        Ok(Self {
            client,
            base_url: api_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn send(&self, path: &str, query: &[(String, String)]) -> RemoteResult<Response> {
        let url = self.url(path);
        tracing::debug!(url = %url, params = query.len(), "请求远程接口");

        let response = self
            .client
            .get(&url)
            .basic_auth(&self.api_key, Some(""))
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            let (resource, id) = split_path(path);
            return Err(RemoteError::NotFound { resource, id });
        }
        if !status.is_success() {
            let mut message = response.text().await.unwrap_or_default();
            if message.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !message.is_char_boundary(cut) {
                    cut -= 1;
                }
                message.truncate(cut);
            }
            tracing::warn!(url = %url, status = status.as_u16(), "远程接口返回错误");
            return Err(RemoteError::Service {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }

    async fn get_json(&self, path: &str, filters: &Filters) -> RemoteResult<Value> {
        let mut query: Vec<(String, String)> = vec![("output_format".to_string(), "JSON".to_string())];
        query.extend(filters.iter().map(|(k, v)| (k.clone(), v.clone())));

        let response = self.send(path, &query).await?;
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Array(Vec::new()));
        }
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl RemoteAdapter for HttpAdapter {
    async fn read(&self, resource: &str, id: &str) -> RemoteResult<Value> {
        let body = self
            .get_json(&format!("{}/{}", resource, id.trim()), &Filters::new())
            .await?;
        Ok(unwrap_record(body))
    }

    async fn get(&self, resource: &str, filters: &Filters) -> RemoteResult<Value> {
        self.get_json(resource, filters).await
    }

    async fn read_binary(&self, path: &str) -> RemoteResult<BinaryContent> {
        let response = self.send(path, &[]).await?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let content = response.bytes().await?.to_vec();
        Ok(BinaryContent {
            content,
            content_type,
        })
    }
}

/// "products/5" → ("products", "5")
fn split_path(path: &str) -> (String, String) {
    let trimmed = path.trim_matches('/');
    match trimmed.rsplit_once('/') {
        Some((resource, id)) => (resource.to_string(), id.to_string()),
        None => (trimmed.to_string(), String::new()),
    }
}
