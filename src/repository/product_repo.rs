// ==========================================
// 商品同步连接器 - 商品仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 覆盖表:
// - product_template (+ _category / _tax 关系集合)
// - product_variant (+ product_variant_attribute_value)
// - product_attribute_line (+ _value)
// ==========================================

use crate::db::SharedConnection;
use crate::domain::product::{
    AttributeLine, AttributeValueRef, ProductTemplate, ProductVariant, TemplateValues,
    VariantValues,
};
use crate::domain::types::ProductType;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::collections::BTreeMap;

// ==========================================
// ProductRepository - 商品仓储
// ==========================================
pub struct ProductRepository {
    conn: SharedConnection,
}

impl ProductRepository {
    pub fn from_connection(conn: SharedConnection) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 模板
    // ==========================================

    /// 编码是否被其他模板占用（exclude_template 不计入）
    pub fn code_taken(
        &self,
        code: &str,
        company_id: i64,
        exclude_template: Option<i64>,
    ) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let found = conn
            .query_row(
                r#"
                SELECT 1 FROM product_template
                WHERE default_code = ?1 AND company_id = ?2
                  AND (?3 IS NULL OR id != ?3)
                LIMIT 1
                "#,
                params![code, company_id, exclude_template],
                |_row| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// 按编码查找模板（公司范围内）
    pub fn find_template_by_code(
        &self,
        code: &str,
        company_id: i64,
    ) -> RepositoryResult<Option<i64>> {
        let conn = self.get_conn()?;
        let id = conn
            .query_row(
                r#"
                SELECT id FROM product_template
                WHERE default_code = ?1 AND company_id = ?2
                ORDER BY id LIMIT 1
                "#,
                params![code, company_id],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(id)
    }

    /// 新建模板
    ///
    /// 同时创建一个无属性的变体（本地实体创建的固有行为），
    /// 并写入分类集合与税集合。
    pub fn create_template(&self, values: &TemplateValues) -> RepositoryResult<i64> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let extra_json = if values.extra.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&values.extra)?)
        };

        tx.execute(
            r#"
            INSERT INTO product_template (
                name, default_code, barcode,
                list_price, standard_price, wholesale_price, weight,
                description, description_html, description_short_html,
                always_available, sale_ok, purchase_ok, product_type,
                default_category_id, company_id,
                link_rewrite, reference, available_for_order, on_sale,
                tags, date_add, date_upd, extra_json
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12,
                ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24
            )
            "#,
            params![
                values.name.clone().unwrap_or_default(),
                values.default_code,
                values.barcode,
                values.list_price.unwrap_or(0.0),
                values.standard_price,
                values.wholesale_price,
                values.weight,
                values.description,
                values.description_html,
                values.description_short_html,
                values.always_available.unwrap_or(false),
                values.sale_ok.unwrap_or(true),
                values.purchase_ok.unwrap_or(true),
                values.product_type.unwrap_or(ProductType::Product).as_str(),
                values.default_category_id,
                values.company_id.unwrap_or(1),
                values.link_rewrite,
                values.reference,
                values.available_for_order,
                values.on_sale,
                values.tags,
                values.date_add,
                values.date_upd,
                extra_json,
            ],
        )?;
        let template_id = tx.last_insert_rowid();

        tx.execute(
            "INSERT INTO product_variant (template_id, active) VALUES (?1, 1)",
            params![template_id],
        )?;

        if let Some(categ_ids) = &values.categ_ids {
            replace_links(&tx, "product_template_category", "category_id", template_id, categ_ids)?;
        }
        if let Some(tax_ids) = &values.taxes_id {
            replace_links(&tx, "product_template_tax", "tax_id", template_id, tax_ids)?;
        }

        tx.commit()?;
        Ok(template_id)
    }

    /// 更新模板: 只写入 values 中出现的字段，其余保留原值
    pub fn update_template(&self, template_id: i64, values: &TemplateValues) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let existing_extra: Option<String> = tx
            .query_row(
                "SELECT extra_json FROM product_template WHERE id = ?1",
                params![template_id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "product_template".to_string(),
                id: template_id.to_string(),
            })?;

        let extra_json = if values.extra.is_empty() {
            existing_extra
        } else {
            let mut merged: BTreeMap<String, Value> = match existing_extra.as_deref() {
                Some(raw) => serde_json::from_str(raw)?,
                None => BTreeMap::new(),
            };
            merged.extend(values.extra.iter().map(|(k, v)| (k.clone(), v.clone())));
            Some(serde_json::to_string(&merged)?)
        };

        tx.execute(
            r#"
            UPDATE product_template SET
                name = COALESCE(?1, name),
                default_code = COALESCE(?2, default_code),
                barcode = COALESCE(?3, barcode),
                list_price = COALESCE(?4, list_price),
                standard_price = COALESCE(?5, standard_price),
                wholesale_price = COALESCE(?6, wholesale_price),
                weight = COALESCE(?7, weight),
                description = COALESCE(?8, description),
                description_html = COALESCE(?9, description_html),
                description_short_html = COALESCE(?10, description_short_html),
                always_available = COALESCE(?11, always_available),
                sale_ok = COALESCE(?12, sale_ok),
                purchase_ok = COALESCE(?13, purchase_ok),
                product_type = COALESCE(?14, product_type),
                default_category_id = COALESCE(?15, default_category_id),
                company_id = COALESCE(?16, company_id),
                link_rewrite = COALESCE(?17, link_rewrite),
                reference = COALESCE(?18, reference),
                available_for_order = COALESCE(?19, available_for_order),
                on_sale = COALESCE(?20, on_sale),
                tags = COALESCE(?21, tags),
                date_add = COALESCE(?22, date_add),
                date_upd = COALESCE(?23, date_upd),
                extra_json = ?24
            WHERE id = ?25
            "#,
            params![
                values.name,
                values.default_code,
                values.barcode,
                values.list_price,
                values.standard_price,
                values.wholesale_price,
                values.weight,
                values.description,
                values.description_html,
                values.description_short_html,
                values.always_available,
                values.sale_ok,
                values.purchase_ok,
                values.product_type.map(|t| t.as_str()),
                values.default_category_id,
                values.company_id,
                values.link_rewrite,
                values.reference,
                values.available_for_order,
                values.on_sale,
                values.tags,
                values.date_add,
                values.date_upd,
                extra_json,
                template_id,
            ],
        )?;

        if let Some(categ_ids) = &values.categ_ids {
            replace_links(&tx, "product_template_category", "category_id", template_id, categ_ids)?;
        }
        if let Some(tax_ids) = &values.taxes_id {
            replace_links(&tx, "product_template_tax", "tax_id", template_id, tax_ids)?;
        }

        tx.commit()?;
        Ok(())
    }

    /// 按 id 查询模板
    pub fn find_template(&self, template_id: i64) -> RepositoryResult<Option<ProductTemplate>> {
        let conn = self.get_conn()?;
        let template = conn
            .query_row(
                r#"
                SELECT id, name, default_code, barcode, list_price, product_type,
                       always_available, sale_ok, purchase_ok, default_category_id,
                       company_id, description, description_html, tags,
                       date_add, date_upd, extra_json
                FROM product_template WHERE id = ?1
                "#,
                params![template_id],
                |row| {
                    let extra_json: Option<String> = row.get(16)?;
                    Ok(ProductTemplate {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        default_code: row.get(2)?,
                        barcode: row.get(3)?,
                        list_price: row.get(4)?,
                        product_type: ProductType::from_db(&row.get::<_, String>(5)?),
                        always_available: row.get(6)?,
                        sale_ok: row.get(7)?,
                        purchase_ok: row.get(8)?,
                        default_category_id: row.get(9)?,
                        company_id: row.get(10)?,
                        description: row.get(11)?,
                        description_html: row.get(12)?,
                        tags: row.get(13)?,
                        date_add: row.get(14)?,
                        date_upd: row.get(15)?,
                        extra: extra_json
                            .and_then(|raw| serde_json::from_str(&raw).ok())
                            .unwrap_or_default(),
                    })
                },
            )
            .optional()?;
        Ok(template)
    }

    pub fn get_template(&self, template_id: i64) -> RepositoryResult<ProductTemplate> {
        self.find_template(template_id)?
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "product_template".to_string(),
                id: template_id.to_string(),
            })
    }

    /// 模板的分类集合
    pub fn template_categories(&self, template_id: i64) -> RepositoryResult<Vec<i64>> {
        let conn = self.get_conn()?;
        list_links(&conn, "product_template_category", "category_id", template_id)
    }

    /// 模板的税集合
    pub fn template_taxes(&self, template_id: i64) -> RepositoryResult<Vec<i64>> {
        let conn = self.get_conn()?;
        list_links(&conn, "product_template_tax", "tax_id", template_id)
    }

    // ==========================================
    // 变体
    // ==========================================

    pub fn create_variant(&self, values: &VariantValues) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO product_variant (template_id, default_code, barcode, price_extra, active)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                values.template_id,
                values.default_code,
                values.barcode,
                values.price_extra,
                values.active,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// 更新变体（编码/条码缺失时保留原值）
    pub fn update_variant(&self, variant_id: i64, values: &VariantValues) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            UPDATE product_variant SET
                template_id = ?1,
                default_code = COALESCE(?2, default_code),
                barcode = COALESCE(?3, barcode),
                price_extra = ?4
            WHERE id = ?5
            "#,
            params![
                values.template_id,
                values.default_code,
                values.barcode,
                values.price_extra,
                variant_id,
            ],
        )?;
        Ok(())
    }

    /// 整体替换变体的属性值
    pub fn set_variant_attribute_values(
        &self,
        variant_id: i64,
        value_ids: &[i64],
    ) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM product_variant_attribute_value WHERE variant_id = ?1",
            params![variant_id],
        )?;
        for value_id in value_ids {
            tx.execute(
                "INSERT OR IGNORE INTO product_variant_attribute_value (variant_id, value_id) VALUES (?1, ?2)",
                params![variant_id, value_id],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn set_variant_active(&self, variant_id: i64, active: bool) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "UPDATE product_variant SET active = ?1 WHERE id = ?2",
            params![active, variant_id],
        )?;
        Ok(())
    }

    /// 模板下全部变体（含停用），按 id 升序
    pub fn list_variants(&self, template_id: i64) -> RepositoryResult<Vec<ProductVariant>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, template_id, default_code, barcode, price_extra, active
            FROM product_variant WHERE template_id = ?1
            ORDER BY id
            "#,
        )?;
        let mut variants = stmt
            .query_map(params![template_id], map_variant_row)?
            .collect::<Result<Vec<_>, _>>()?;
        for variant in variants.iter_mut() {
            variant.attribute_values = variant_attribute_values(&conn, variant.id)?;
        }
        Ok(variants)
    }

    // ==========================================
    // 属性行
    // ==========================================

    pub fn attribute_lines(&self, template_id: i64) -> RepositoryResult<Vec<AttributeLine>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, template_id, attribute_id FROM product_attribute_line WHERE template_id = ?1 ORDER BY id",
        )?;
        let mut lines = stmt
            .query_map(params![template_id], |row| {
                Ok(AttributeLine {
                    id: row.get(0)?,
                    template_id: row.get(1)?,
                    attribute_id: row.get(2)?,
                    value_ids: Vec::new(),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut value_stmt = conn.prepare(
            "SELECT value_id FROM product_attribute_line_value WHERE line_id = ?1 ORDER BY value_id",
        )?;
        for line in lines.iter_mut() {
            line.value_ids = value_stmt
                .query_map(params![line.id], |row| row.get::<_, i64>(0))?
                .collect::<Result<Vec<_>, _>>()?;
        }
        Ok(lines)
    }

    pub fn create_attribute_line(
        &self,
        template_id: i64,
        attribute_id: i64,
        value_ids: &[i64],
    ) -> RepositoryResult<i64> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO product_attribute_line (template_id, attribute_id) VALUES (?1, ?2)",
            params![template_id, attribute_id],
        )?;
        let line_id = tx.last_insert_rowid();
        for value_id in value_ids {
            tx.execute(
                "INSERT OR IGNORE INTO product_attribute_line_value (line_id, value_id) VALUES (?1, ?2)",
                params![line_id, value_id],
            )?;
        }
        tx.commit()?;
        Ok(line_id)
    }

    pub fn add_attribute_line_values(&self, line_id: i64, value_ids: &[i64]) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        for value_id in value_ids {
            tx.execute(
                "INSERT OR IGNORE INTO product_attribute_line_value (line_id, value_id) VALUES (?1, ?2)",
                params![line_id, value_id],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}

// ==========================================
// 内部辅助
// ==========================================

fn replace_links(
    conn: &Connection,
    table: &str,
    column: &str,
    template_id: i64,
    ids: &[i64],
) -> rusqlite::Result<()> {
    conn.execute(
        &format!("DELETE FROM {} WHERE template_id = ?1", table),
        params![template_id],
    )?;
    let insert = format!(
        "INSERT OR IGNORE INTO {} (template_id, {}) VALUES (?1, ?2)",
        table, column
    );
    for id in ids {
        conn.execute(&insert, params![template_id, id])?;
    }
    Ok(())
}

fn list_links(
    conn: &Connection,
    table: &str,
    column: &str,
    template_id: i64,
) -> RepositoryResult<Vec<i64>> {
    let sql = format!(
        "SELECT {col} FROM {table} WHERE template_id = ?1 ORDER BY {col}",
        col = column,
        table = table
    );
    let mut stmt = conn.prepare(&sql)?;
    let ids = stmt
        .query_map(params![template_id], |row| row.get::<_, i64>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ids)
}

fn map_variant_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ProductVariant> {
    Ok(ProductVariant {
        id: row.get(0)?,
        template_id: row.get(1)?,
        default_code: row.get(2)?,
        barcode: row.get(3)?,
        price_extra: row.get(4)?,
        active: row.get(5)?,
        attribute_values: Vec::new(),
    })
}

fn variant_attribute_values(
    conn: &Connection,
    variant_id: i64,
) -> RepositoryResult<Vec<AttributeValueRef>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT v.id, v.attribute_id
        FROM product_variant_attribute_value pv
        JOIN product_attribute_value v ON v.id = pv.value_id
        WHERE pv.variant_id = ?1
        ORDER BY v.attribute_id, v.id
        "#,
    )?;
    let values = stmt
        .query_map(params![variant_id], |row| {
            Ok(AttributeValueRef {
                value_id: row.get(0)?,
                attribute_id: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(values)
}
