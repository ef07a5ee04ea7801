// ==========================================
// 商品同步连接器 - 供应商仓储
// ==========================================
// 覆盖表: product_supplier / product_supplierinfo
// ==========================================

use crate::db::SharedConnection;
use crate::domain::product::SupplierInfoValues;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};

pub struct SupplierRepository {
    conn: SharedConnection,
}

impl SupplierRepository {
    pub fn from_connection(conn: SharedConnection) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ===== 供应商 =====

    pub fn create_supplier(&self, name: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute("INSERT INTO product_supplier (name) VALUES (?1)", params![name])?;
        Ok(conn.last_insert_rowid())
    }

    pub fn rename_supplier(&self, supplier_id: i64, name: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "UPDATE product_supplier SET name = ?1 WHERE id = ?2",
            params![name, supplier_id],
        )?;
        Ok(())
    }

    // ===== 供应商价目 =====

    pub fn create_info(&self, values: &SupplierInfoValues) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO product_supplierinfo (template_id, supplier_id, product_code, price)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![values.template_id, values.supplier_id, values.product_code, values.price],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn update_info(&self, info_id: i64, values: &SupplierInfoValues) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            UPDATE product_supplierinfo
            SET template_id = ?1, supplier_id = ?2, product_code = ?3, price = ?4
            WHERE id = ?5
            "#,
            params![
                values.template_id,
                values.supplier_id,
                values.product_code,
                values.price,
                info_id
            ],
        )?;
        Ok(())
    }

    pub fn find_info(&self, info_id: i64) -> RepositoryResult<Option<SupplierInfoValues>> {
        let conn = self.get_conn()?;
        let info = conn
            .query_row(
                "SELECT template_id, supplier_id, product_code, price FROM product_supplierinfo WHERE id = ?1",
                params![info_id],
                |row| {
                    Ok(SupplierInfoValues {
                        template_id: row.get(0)?,
                        supplier_id: row.get(1)?,
                        product_code: row.get(2)?,
                        price: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(info)
    }

    /// 模板下的全部供应商价目 id
    pub fn info_ids_for_template(&self, template_id: i64) -> RepositoryResult<Vec<i64>> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT id FROM product_supplierinfo WHERE template_id = ?1 ORDER BY id")?;
        let ids = stmt
            .query_map(params![template_id], |row| row.get::<_, i64>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    pub fn delete_info(&self, info_id: i64) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute("DELETE FROM product_supplierinfo WHERE id = ?1", params![info_id])?;
        Ok(())
    }
}
