// ==========================================
// 商品同步连接器 - 税仓储
// ==========================================
// 说明: 税与税组由运营人员手工配置并绑定，导入只读取
// ==========================================

use crate::db::SharedConnection;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};

/// 单个税
#[derive(Debug, Clone, PartialEq)]
pub struct TaxEntity {
    pub id: i64,
    pub name: String,
    /// 税率（百分比，如 20.0）
    pub amount: f64,
    pub price_include: bool,
}

pub struct TaxRepository {
    conn: SharedConnection,
}

impl TaxRepository {
    pub fn from_connection(conn: SharedConnection) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn create_tax(&self, name: &str, amount: f64, price_include: bool) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO account_tax (name, amount, price_include) VALUES (?1, ?2, ?3)",
            params![name, amount, price_include],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// 新建税组并挂载税
    pub fn create_group(&self, name: &str, tax_ids: &[i64]) -> RepositoryResult<i64> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        tx.execute("INSERT INTO account_tax_group (name) VALUES (?1)", params![name])?;
        let group_id = tx.last_insert_rowid();
        for tax_id in tax_ids {
            tx.execute(
                "INSERT OR IGNORE INTO account_tax_group_tax (group_id, tax_id) VALUES (?1, ?2)",
                params![group_id, tax_id],
            )?;
        }
        tx.commit()?;
        Ok(group_id)
    }

    /// 税组下的全部税（按 id 升序）
    pub fn group_taxes(&self, group_id: i64) -> RepositoryResult<Vec<TaxEntity>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT t.id, t.name, t.amount, t.price_include
            FROM account_tax_group_tax gt
            JOIN account_tax t ON t.id = gt.tax_id
            WHERE gt.group_id = ?1
            ORDER BY t.id
            "#,
        )?;
        let taxes = stmt
            .query_map(params![group_id], |row| {
                Ok(TaxEntity {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    amount: row.get(2)?,
                    price_include: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(taxes)
    }
}
