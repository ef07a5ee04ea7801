// ==========================================
// 商品同步连接器 - 库存仓储
// ==========================================
// 约束: 只提供“设置绝对数量”，不提供增量
// ==========================================

use crate::db::SharedConnection;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};

pub struct StockRepository {
    conn: SharedConnection,
}

impl StockRepository {
    pub fn from_connection(conn: SharedConnection) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 设置变体在库位上的绝对数量
    pub fn set_quantity(&self, variant_id: i64, location_id: i64, quantity: f64) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO stock_quant (variant_id, location_id, quantity, updated_at)
            VALUES (?1, ?2, ?3, datetime('now'))
            ON CONFLICT(variant_id, location_id) DO UPDATE SET
                quantity = excluded.quantity,
                updated_at = excluded.updated_at
            "#,
            params![variant_id, location_id, quantity],
        )?;
        Ok(())
    }

    pub fn quantity(&self, variant_id: i64, location_id: i64) -> RepositoryResult<Option<f64>> {
        let conn = self.get_conn()?;
        let qty = conn
            .query_row(
                "SELECT quantity FROM stock_quant WHERE variant_id = ?1 AND location_id = ?2",
                params![variant_id, location_id],
                |row| row.get::<_, f64>(0),
            )
            .optional()?;
        Ok(qty)
    }
}
