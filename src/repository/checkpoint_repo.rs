// ==========================================
// 商品同步连接器 - 检查点仓储
// ==========================================
// 职责: 记录需要运营人员跟进的数据质量提示
// ==========================================

use crate::db::SharedConnection;
use crate::domain::product::Checkpoint;
use crate::domain::types::ModelName;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};

pub struct CheckpointRepository {
    conn: SharedConnection,
}

impl CheckpointRepository {
    pub fn from_connection(conn: SharedConnection) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 新增检查点，返回 id
    pub fn add(
        &self,
        backend_id: i64,
        model: ModelName,
        record_id: i64,
        message: &str,
    ) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO connector_checkpoint (backend_id, model, record_id, message)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![backend_id, model.as_str(), record_id, message],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// 列出检查点
    ///
    /// # 参数
    /// - only_pending: true 时只返回未复核的检查点
    pub fn list(&self, backend_id: i64, only_pending: bool) -> RepositoryResult<Vec<Checkpoint>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, backend_id, model, record_id, message, reviewed, created_at
            FROM connector_checkpoint
            WHERE backend_id = ?1 AND (?2 = 0 OR reviewed = 0)
            ORDER BY id
            "#,
        )?;
        let checkpoints = stmt
            .query_map(params![backend_id, only_pending], |row| {
                Ok(Checkpoint {
                    id: row.get(0)?,
                    backend_id: row.get(1)?,
                    model: row.get(2)?,
                    record_id: row.get(3)?,
                    message: row.get(4)?,
                    reviewed: row.get(5)?,
                    created_at: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(checkpoints)
    }

    pub fn mark_reviewed(&self, checkpoint_id: i64) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "UPDATE connector_checkpoint SET reviewed = 1 WHERE id = ?1",
            params![checkpoint_id],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;

    #[test]
    fn test_add_and_review() {
        let conn = open_in_memory().unwrap();
        conn.lock()
            .unwrap()
            .execute(
                "INSERT INTO shop_backend (id, name, api_url, api_key) VALUES (1, 's', 'u', 'k')",
                [],
            )
            .unwrap();
        let repo = CheckpointRepository::from_connection(conn);

        let id = repo.add(1, ModelName::ProductTemplate, 42, "The default category could not be imported.").unwrap();
        assert_eq!(repo.list(1, true).unwrap().len(), 1);

        repo.mark_reviewed(id).unwrap();
        assert!(repo.list(1, true).unwrap().is_empty());
        assert_eq!(repo.list(1, false).unwrap()[0].record_id, 42);
    }
}
