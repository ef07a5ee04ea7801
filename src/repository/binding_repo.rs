// ==========================================
// 商品同步连接器 - 绑定仓储 (Binder)
// ==========================================
// 职责: (backend, model, remote_id) ↔ 本地实体 的查找表
// 约束: 同一 (backend, model, remote_id) 至多一条绑定
// ==========================================

use crate::db::SharedConnection;
use crate::domain::types::ModelName;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

/// Binder: 某一后端、某一模型的绑定视图
#[derive(Clone)]
pub struct Binder {
    conn: SharedConnection,
    backend_id: i64,
    model: ModelName,
}

impl Binder {
    pub fn new(conn: SharedConnection, backend_id: i64, model: ModelName) -> Self {
        Self {
            conn,
            backend_id,
            model,
        }
    }

    pub fn model(&self) -> ModelName {
        self.model
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 远程 id → 本地 id
    ///
    /// # 参数
    /// - remote_id: 远程 id
    /// - unwrap: true 返回底层业务实体 id；false 返回绑定记录自身 id
    ///
    /// # 返回
    /// - Ok(None): 尚未绑定
    pub fn to_local(&self, remote_id: &str, unwrap: bool) -> RepositoryResult<Option<i64>> {
        let conn = self.get_conn()?;
        let column = if unwrap { "local_id" } else { "id" };
        let sql = format!(
            "SELECT {} FROM remote_binding WHERE backend_id = ?1 AND model = ?2 AND remote_id = ?3",
            column
        );
        let id = conn
            .query_row(
                &sql,
                params![self.backend_id, self.model.as_str(), remote_id.trim()],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(id)
    }

    pub fn is_bound(&self, remote_id: &str) -> RepositoryResult<bool> {
        Ok(self.to_local(remote_id, false)?.is_some())
    }

    /// 建立（或刷新）绑定，返回绑定记录 id
    pub fn bind(&self, remote_id: &str, local_id: i64) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let now = Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();
        conn.execute(
            r#"
            INSERT INTO remote_binding (backend_id, model, remote_id, local_id, sync_date)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(backend_id, model, remote_id) DO UPDATE SET
                local_id = excluded.local_id,
                sync_date = excluded.sync_date
            "#,
            params![self.backend_id, self.model.as_str(), remote_id.trim(), local_id, now],
        )?;
        let id = conn.query_row(
            "SELECT id FROM remote_binding WHERE backend_id = ?1 AND model = ?2 AND remote_id = ?3",
            params![self.backend_id, self.model.as_str(), remote_id.trim()],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    /// 删除绑定；返回是否存在过
    pub fn unbind(&self, remote_id: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let deleted = conn.execute(
            "DELETE FROM remote_binding WHERE backend_id = ?1 AND model = ?2 AND remote_id = ?3",
            params![self.backend_id, self.model.as_str(), remote_id.trim()],
        )?;
        Ok(deleted > 0)
    }

    /// 本地 id → 远程 id 列表
    pub fn remote_ids_for_local(&self, local_id: i64) -> RepositoryResult<Vec<String>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT remote_id FROM remote_binding
            WHERE backend_id = ?1 AND model = ?2 AND local_id = ?3
            ORDER BY id
            "#,
        )?;
        let rows = stmt.query_map(params![self.backend_id, self.model.as_str(), local_id], |row| {
            row.get::<_, String>(0)
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;

    fn setup() -> SharedConnection {
        let conn = open_in_memory().unwrap();
        conn.lock()
            .unwrap()
            .execute(
                "INSERT INTO shop_backend (id, name, api_url, api_key) VALUES (1, 's', 'u', 'k')",
                [],
            )
            .unwrap();
        conn
    }

    #[test]
    fn test_bind_and_lookup() {
        let binder = Binder::new(setup(), 1, ModelName::ProductCategory);

        assert_eq!(binder.to_local("3", true).unwrap(), None);
        let binding_id = binder.bind("3", 77).unwrap();

        assert_eq!(binder.to_local("3", true).unwrap(), Some(77));
        assert_eq!(binder.to_local(" 3 ", false).unwrap(), Some(binding_id));
        assert_eq!(binder.remote_ids_for_local(77).unwrap(), vec!["3".to_string()]);
    }

    #[test]
    fn test_rebind_keeps_single_row() {
        let conn = setup();
        let binder = Binder::new(conn.clone(), 1, ModelName::ProductTemplate);

        let first = binder.bind("5", 1).unwrap();
        let second = binder.bind("5", 2).unwrap();
        assert_eq!(first, second);
        assert_eq!(binder.to_local("5", true).unwrap(), Some(2));

        let count: i64 = conn
            .lock()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM remote_binding", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_models_are_isolated() {
        let conn = setup();
        let categories = Binder::new(conn.clone(), 1, ModelName::ProductCategory);
        let templates = Binder::new(conn, 1, ModelName::ProductTemplate);

        categories.bind("9", 10).unwrap();
        assert_eq!(templates.to_local("9", true).unwrap(), None);
        assert!(categories.unbind("9").unwrap());
        assert!(!categories.unbind("9").unwrap());
    }
}
