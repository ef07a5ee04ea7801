// ==========================================
// 商品同步连接器 - 商品图片仓储
// ==========================================
// 覆盖表: product_image / product_variant_image
// ==========================================

use crate::db::SharedConnection;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};

/// 图片写入值
#[derive(Debug, Clone, PartialEq)]
pub struct ImageValues {
    pub template_id: i64,
    pub file_name: String,
    pub content_type: Option<String>,
    pub content: Vec<u8>,
}

pub struct ImageRepository {
    conn: SharedConnection,
}

impl ImageRepository {
    pub fn from_connection(conn: SharedConnection) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn create(&self, values: &ImageValues) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO product_image (template_id, file_name, content_type, content)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![values.template_id, values.file_name, values.content_type, values.content],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn update(&self, image_id: i64, values: &ImageValues) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            UPDATE product_image
            SET template_id = ?1, file_name = ?2, content_type = ?3, content = ?4
            WHERE id = ?5
            "#,
            params![
                values.template_id,
                values.file_name,
                values.content_type,
                values.content,
                image_id
            ],
        )?;
        Ok(())
    }

    /// 整体替换变体关联的图片
    pub fn set_variant_images(&self, variant_id: i64, image_ids: &[i64]) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM product_variant_image WHERE variant_id = ?1",
            params![variant_id],
        )?;
        for image_id in image_ids {
            tx.execute(
                "INSERT OR IGNORE INTO product_variant_image (variant_id, image_id) VALUES (?1, ?2)",
                params![variant_id, image_id],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn variant_image_ids(&self, variant_id: i64) -> RepositoryResult<Vec<i64>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT image_id FROM product_variant_image WHERE variant_id = ?1 ORDER BY image_id",
        )?;
        let ids = stmt
            .query_map(params![variant_id], |row| row.get::<_, i64>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }
}
