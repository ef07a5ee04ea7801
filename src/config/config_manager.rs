// ==========================================
// 商品同步连接器 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::db::SharedConnection;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;

// ===== 配置键 =====
pub const KEY_QUEUE_MAX_RETRIES: &str = "queue.max_retries";
pub const KEY_HTTP_TIMEOUT_MS: &str = "http.timeout_ms";
pub const KEY_HTTP_USER_AGENT: &str = "http.user_agent";
pub const KEY_IMPORT_PAGE_SIZE: &str = "import.page_size";
pub const KEY_WORKER_POLL_INTERVAL_MS: &str = "worker.poll_interval_ms";

// ===== 默认值 =====
pub const DEFAULT_MAX_RETRIES: i32 = 3;
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_PAGE_SIZE: usize = 1_000;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;

pub fn default_user_agent() -> String {
    format!("catalog-sync/{}", env!("CARGO_PKG_VERSION"))
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
#[derive(Clone)]
pub struct ConfigManager {
    conn: SharedConnection,
}

impl ConfigManager {
    /// 从已有连接创建 ConfigManager
    pub fn from_connection(conn: SharedConnection) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 写入配置值（存在则覆盖）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO config_kv (scope_id, key, value, updated_at)
            VALUES ('global', ?1, ?2, datetime('now'))
            ON CONFLICT(scope_id, key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            params![key, value],
        )?;
        Ok(())
    }

    /// 读取并解析配置值；缺失或解析失败时返回默认值
    fn get_parsed_or<T: std::str::FromStr>(&self, key: &str, default: T) -> RepositoryResult<T> {
        match self.get_global_config_value(key)? {
            Some(raw) => match raw.trim().parse::<T>() {
                Ok(v) => Ok(v),
                Err(_) => {
                    tracing::warn!(key, value = %raw, "配置值无法解析，使用默认值");
                    Ok(default)
                }
            },
            None => Ok(default),
        }
    }

    /// 失败任务最大重试次数
    pub fn max_retries(&self) -> RepositoryResult<i32> {
        self.get_parsed_or(KEY_QUEUE_MAX_RETRIES, DEFAULT_MAX_RETRIES)
    }

    pub fn http_timeout_ms(&self) -> RepositoryResult<u64> {
        self.get_parsed_or(KEY_HTTP_TIMEOUT_MS, DEFAULT_HTTP_TIMEOUT_MS)
    }

    pub fn http_user_agent(&self) -> RepositoryResult<String> {
        Ok(self
            .get_global_config_value(KEY_HTTP_USER_AGENT)?
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(default_user_agent))
    }

    /// 批量导入分页大小（0 视为默认）
    pub fn page_size(&self) -> RepositoryResult<usize> {
        let size = self.get_parsed_or(KEY_IMPORT_PAGE_SIZE, DEFAULT_PAGE_SIZE)?;
        Ok(if size == 0 { DEFAULT_PAGE_SIZE } else { size })
    }

    pub fn poll_interval_ms(&self) -> RepositoryResult<u64> {
        self.get_parsed_or(KEY_WORKER_POLL_INTERVAL_MS, DEFAULT_POLL_INTERVAL_MS)
    }

    /// 获取所有配置的快照
    pub fn get_config_snapshot(&self) -> RepositoryResult<BTreeMap<String, String>> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;

        let mut snapshot = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            snapshot.insert(key, value);
        }
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;

    #[test]
    fn test_defaults_when_missing() {
        let config = ConfigManager::from_connection(open_in_memory().unwrap());

        assert_eq!(config.max_retries().unwrap(), 3);
        assert_eq!(config.http_timeout_ms().unwrap(), 30_000);
        assert_eq!(config.page_size().unwrap(), 1_000);
        assert!(config.http_user_agent().unwrap().starts_with("catalog-sync/"));
    }

    #[test]
    fn test_set_and_override() {
        let config = ConfigManager::from_connection(open_in_memory().unwrap());

        config.set_global_config_value(KEY_QUEUE_MAX_RETRIES, "5").unwrap();
        config.set_global_config_value(KEY_QUEUE_MAX_RETRIES, "7").unwrap();
        config.set_global_config_value(KEY_IMPORT_PAGE_SIZE, "abc").unwrap();

        assert_eq!(config.max_retries().unwrap(), 7);
        assert_eq!(config.page_size().unwrap(), DEFAULT_PAGE_SIZE);
        assert_eq!(config.get_config_snapshot().unwrap().len(), 2);
    }
}
