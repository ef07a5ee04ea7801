// ==========================================
// 商品同步连接器 - 分类仓储
// ==========================================

use crate::db::SharedConnection;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};

/// 分类写入值
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryValues {
    pub name: String,
    pub parent_id: Option<i64>,
    pub active: bool,
}

/// 本地分类
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryEntity {
    pub id: i64,
    pub name: String,
    pub parent_id: Option<i64>,
    pub active: bool,
}

pub struct CategoryRepository {
    conn: SharedConnection,
}

impl CategoryRepository {
    pub fn from_connection(conn: SharedConnection) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn create(&self, values: &CategoryValues) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO product_category (name, parent_id, active) VALUES (?1, ?2, ?3)",
            params![values.name, values.parent_id, values.active],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn update(&self, category_id: i64, values: &CategoryValues) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "UPDATE product_category SET name = ?1, parent_id = ?2, active = ?3 WHERE id = ?4",
            params![values.name, values.parent_id, values.active, category_id],
        )?;
        Ok(())
    }

    pub fn find_by_id(&self, category_id: i64) -> RepositoryResult<Option<CategoryEntity>> {
        let conn = self.get_conn()?;
        let category = conn
            .query_row(
                "SELECT id, name, parent_id, active FROM product_category WHERE id = ?1",
                params![category_id],
                |row| {
                    Ok(CategoryEntity {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        parent_id: row.get(2)?,
                        active: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;

    #[test]
    fn test_create_with_parent() {
        let repo = CategoryRepository::from_connection(open_in_memory().unwrap());
        let root = repo
            .create(&CategoryValues {
                name: "Root".to_string(),
                parent_id: None,
                active: true,
            })
            .unwrap();
        let child = repo
            .create(&CategoryValues {
                name: "Shirts".to_string(),
                parent_id: Some(root),
                active: false,
            })
            .unwrap();

        let entity = repo.find_by_id(child).unwrap().unwrap();
        assert_eq!(entity.parent_id, Some(root));
        assert!(!entity.active);
    }
}
