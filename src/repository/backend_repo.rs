// ==========================================
// 商品同步连接器 - 后端仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::db::SharedConnection;
use crate::domain::backend::{BackendContext, NewBackend};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Row};

const SELECT_COLUMNS: &str = r#"
    SELECT id, name, api_url, api_key, company_id, language_id,
           taxes_included, stock_location_id, import_products_since
    FROM shop_backend
"#;

/// 后端仓储
/// 职责: 管理 shop_backend 表
pub struct BackendRepository {
    conn: SharedConnection,
}

impl BackendRepository {
    pub fn from_connection(conn: SharedConnection) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 新建后端，返回 id
    pub fn create(&self, backend: &NewBackend) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO shop_backend (
                name, api_url, api_key, company_id, language_id,
                taxes_included, stock_location_id
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                backend.name,
                backend.api_url,
                backend.api_key,
                backend.company_id,
                backend.language_id,
                backend.taxes_included,
                backend.stock_location_id,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// 按 id 查询
    ///
    /// # 返回
    /// - Ok(Some(BackendContext)): 找到
    /// - Ok(None): 未找到
    pub fn find_by_id(&self, id: i64) -> RepositoryResult<Option<BackendContext>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE id = ?1", SELECT_COLUMNS);
        let backend = conn
            .query_row(&sql, params![id], map_backend_row)
            .optional()?;
        Ok(backend)
    }

    /// 按 id 查询，不存在时返回 NotFound
    pub fn get(&self, id: i64) -> RepositoryResult<BackendContext> {
        self.find_by_id(id)?.ok_or_else(|| RepositoryError::NotFound {
            entity: "shop_backend".to_string(),
            id: id.to_string(),
        })
    }

    pub fn list(&self) -> RepositoryResult<Vec<BackendContext>> {
        let conn = self.get_conn()?;
        let sql = format!("{} ORDER BY id", SELECT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], map_backend_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// 记录增量导入的起点
    pub fn set_import_products_since(&self, id: i64, since: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let updated = conn.execute(
            "UPDATE shop_backend SET import_products_since = ?1 WHERE id = ?2",
            params![since, id],
        )?;
        if updated == 0 {
            return Err(RepositoryError::NotFound {
                entity: "shop_backend".to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }
}

fn map_backend_row(row: &Row<'_>) -> rusqlite::Result<BackendContext> {
    Ok(BackendContext {
        id: row.get(0)?,
        name: row.get(1)?,
        api_url: row.get(2)?,
        api_key: row.get(3)?,
        company_id: row.get(4)?,
        language_id: row.get(5)?,
        taxes_included: row.get(6)?,
        stock_location_id: row.get(7)?,
        import_products_since: row.get(8)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;

    fn new_backend() -> NewBackend {
        NewBackend {
            name: "shop".to_string(),
            api_url: "http://shop.local/api".to_string(),
            api_key: "KEY".to_string(),
            company_id: 1,
            language_id: Some("1".to_string()),
            taxes_included: true,
            stock_location_id: 12,
        }
    }

    #[test]
    fn test_create_and_get() {
        let repo = BackendRepository::from_connection(open_in_memory().unwrap());
        let id = repo.create(&new_backend()).unwrap();

        let backend = repo.get(id).unwrap();
        assert!(backend.taxes_included);
        assert_eq!(backend.stock_location_id, 12);
        assert_eq!(backend.import_products_since, None);

        repo.set_import_products_since(id, "2024-01-01 00:00:00").unwrap();
        assert_eq!(
            repo.get(id).unwrap().import_products_since.as_deref(),
            Some("2024-01-01 00:00:00")
        );
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let repo = BackendRepository::from_connection(open_in_memory().unwrap());
        assert!(matches!(repo.get(42), Err(RepositoryError::NotFound { .. })));
    }
}
