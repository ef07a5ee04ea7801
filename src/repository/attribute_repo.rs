// ==========================================
// 商品同步连接器 - 属性仓储
// ==========================================
// 覆盖表: product_attribute / product_attribute_value
// ==========================================

use crate::db::SharedConnection;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};

pub struct AttributeRepository {
    conn: SharedConnection,
}

impl AttributeRepository {
    pub fn from_connection(conn: SharedConnection) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn create_attribute(&self, name: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute("INSERT INTO product_attribute (name) VALUES (?1)", params![name])?;
        Ok(conn.last_insert_rowid())
    }

    pub fn rename_attribute(&self, attribute_id: i64, name: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "UPDATE product_attribute SET name = ?1 WHERE id = ?2",
            params![name, attribute_id],
        )?;
        Ok(())
    }

    pub fn create_value(&self, attribute_id: i64, name: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO product_attribute_value (attribute_id, name) VALUES (?1, ?2)",
            params![attribute_id, name],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn update_value(&self, value_id: i64, attribute_id: i64, name: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "UPDATE product_attribute_value SET attribute_id = ?1, name = ?2 WHERE id = ?3",
            params![attribute_id, name, value_id],
        )?;
        Ok(())
    }

    /// 属性值名称
    pub fn value_name(&self, value_id: i64) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let name = conn
            .query_row(
                "SELECT name FROM product_attribute_value WHERE id = ?1",
                params![value_id],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(name)
    }
}
