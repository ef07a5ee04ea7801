// ==========================================
// 商品同步连接器 - 远程接口错误类型
// ==========================================

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RemoteError {
    /// 远程记录不存在（HTTP 404）
    #[error("远程记录不存在: {resource}/{id}")]
    NotFound { resource: String, id: String },

    /// 远程服务返回错误状态
    #[error("远程服务错误 (status={status}): {message}")]
    Service { status: u16, message: String },

    #[error("远程请求失败: {0}")]
    Transport(String),

    #[error("远程响应解析失败: {0}")]
    Decode(String),

    #[error("HTTP 客户端初始化失败: {0}")]
    Client(String),
}

impl RemoteError {
    /// 是否为远程服务错误（服务端明确返回的失败，含 404）
    pub fn is_service_error(&self) -> bool {
        matches!(self, RemoteError::NotFound { .. } | RemoteError::Service { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteError::NotFound { .. })
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RemoteError::Decode(err.to_string())
        } else {
            RemoteError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for RemoteError {
    fn from(err: serde_json::Error) -> Self {
        RemoteError::Decode(err.to_string())
    }
}

pub type RemoteResult<T> = Result<T, RemoteError>;
