// ==========================================
// 商品同步连接器 - 商品模板映射
// ==========================================
// 职责: 远程商品记录 → 本地模板字段
// 约束: 只读本地已导入实体（分类/税组/编码），不写库
// ==========================================
// 字段规则:
// - name: 空 → "noname"
// - date_add / date_upd: "0000-00-00 00:00:00" → 映射时刻
// - list_price: 解析报价后按后端含税策略调整
// - default_code / barcode: 存在组合时不产出
// - description: 短描述纯文本；*_html: 去除 xml:lang 的原标记
// - always_available: active 标志
// - sale_ok / purchase_ok: 恒为 true
// - type: "virtual" → service，其余 → product
// ==========================================

use crate::domain::product::MappedValues;
use crate::domain::record::{
    association, field_text, flag, id_of, is_unset_id, non_blank, translated_field,
};
use crate::domain::types::{ModelName, ProductType};
use crate::importer::barcode::check_ean;
use crate::importer::code_reconciler::{base_code, reconcile_code};
use crate::importer::context::ImportContext;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::extension::MapperInput;
use crate::importer::html::{html_to_text, sanitize_html};
use crate::importer::pricing::{apply_taxes, parse_price, EffectiveTax};
use crate::remote::filters;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

/// 远程“未设置”时间戳
pub const UNSET_TIMESTAMP: &str = "0000-00-00 00:00:00";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ==========================================
// TemplateMapper
// ==========================================
pub struct TemplateMapper<'a> {
    ctx: &'a ImportContext,
    record: &'a Value,
}

impl<'a> TemplateMapper<'a> {
    pub fn new(ctx: &'a ImportContext, record: &'a Value) -> Self {
        Self { ctx, record }
    }

    /// 执行全部映射规则
    ///
    /// # 参数
    /// - bound_template: 已绑定的本地模板；None 表示首次创建
    pub async fn map(&self, bound_template: Option<i64>) -> ImportResult<MappedValues> {
        let backend = self.ctx.backend();
        let language = backend.language_id.as_deref();
        let mut values = MappedValues::new();

        values.extend(map_name(self.record, language));
        values.extend(map_dates(self.record, Utc::now()));

        let tax = self.effective_tax()?;
        values.extend(self.list_price(tax.as_ref())?);
        values.extend(self.taxes_id()?);
        values.extend(self.tags().await?);

        // 首次创建时尝试按 reference 绑定已有模板
        let matched = match bound_template {
            Some(_) => None,
            None => self.match_existing()?,
        };
        if let Some(local_id) = matched {
            values.insert("local_id".to_string(), json!(local_id));
        }
        values.extend(self.default_code(bound_template.or(matched))?);
        values.extend(map_barcode(self.record));

        values.extend(map_descriptions(self.record, language));
        values.extend(map_flags(self.record));
        values.extend(self.categ_ids()?);
        values.extend(self.default_category_id()?);
        values.extend(map_type(self.record));
        values.extend(map_direct(self.record, language));

        values.insert("backend_id".to_string(), json!(backend.id));
        values.insert("company_id".to_string(), json!(backend.company_id));

        self.ctx.extensions().apply(
            &MapperInput {
                record: self.record,
                backend,
            },
            &mut values,
        );
        Ok(values)
    }

    fn remote_id(&self) -> String {
        field_text(self.record, "id").unwrap_or_default()
    }

    /// 税组的等效税；税组未绑定时为 None
    fn effective_tax(&self) -> ImportResult<Option<EffectiveTax>> {
        let Some(group_id) = self.tax_group()? else {
            return Ok(None);
        };
        let taxes = self.ctx.taxes().group_taxes(group_id)?;
        Ok(EffectiveTax::from_taxes(&taxes))
    }

    fn tax_group(&self) -> ImportResult<Option<i64>> {
        let remote_group = field_text(self.record, "id_tax_rules_group");
        if is_unset_id(remote_group.as_deref()) {
            return Ok(None);
        }
        let remote_group = remote_group.unwrap_or_default();
        Ok(self
            .ctx
            .binder(ModelName::TaxGroup)
            .to_local(&remote_group, true)?)
    }

    fn list_price(&self, tax: Option<&EffectiveTax>) -> ImportResult<MappedValues> {
        let raw = field_text(self.record, "price").unwrap_or_default();
        let price = parse_price(&raw).ok_or_else(|| ImportError::InvalidRecord {
            model: ModelName::ProductTemplate,
            remote_id: self.remote_id(),
            message: format!("价格无法解析: {:?}", raw),
        })?;
        let price = apply_taxes(price, self.ctx.backend().taxes_included, tax);
        Ok(single("list_price", json!(price)))
    }

    /// 税组下的本地税（整体替换；税组未解析时清空）
    fn taxes_id(&self) -> ImportResult<MappedValues> {
        let tax_ids: Vec<i64> = match self.tax_group()? {
            Some(group_id) => self
                .ctx
                .taxes()
                .group_taxes(group_id)?
                .into_iter()
                .map(|t| t.id)
                .collect(),
            None => Vec::new(),
        };
        Ok(single("taxes_id", json!(tax_ids)))
    }

    async fn tags(&self) -> ImportResult<MappedValues> {
        let tag_ids: Vec<String> = association(self.record, "tags", "tag")
            .iter()
            .filter_map(id_of)
            .collect();
        if tag_ids.is_empty() {
            return Ok(MappedValues::new());
        }

        let query = filters([
            ("filter[id]", format!("[{}]", tag_ids.join("|"))),
            ("display", "[name]".to_string()),
        ]);
        let found = self.ctx.adapter().search("tags", &query).await?;
        let language = self.ctx.backend().language_id.as_deref();
        let names: Vec<String> = found
            .iter()
            .filter_map(|tag| translated_field(tag, "name", language))
            .collect();
        if names.is_empty() {
            return Ok(MappedValues::new());
        }
        Ok(single("tags", json!(names.join(","))))
    }

    fn has_combinations(&self) -> bool {
        has_combinations(self.record)
    }

    /// 按 reference 查找已有本地模板
    ///
    /// 已绑定到本后端其他远程商品的模板不参与匹配
    fn match_existing(&self) -> ImportResult<Option<i64>> {
        let Some(reference) = non_blank(self.record, "reference") else {
            return Ok(None);
        };
        let Some(local_id) = self
            .ctx
            .products()
            .find_template_by_code(&reference, self.ctx.backend().company_id)?
        else {
            return Ok(None);
        };
        let bound_to = self
            .ctx
            .binder(ModelName::ProductTemplate)
            .remote_ids_for_local(local_id)?;
        if !bound_to.is_empty() {
            tracing::debug!(
                reference = %reference,
                local_id,
                bound_to = ?bound_to,
                "同编码模板已绑定其他远程商品，不复用"
            );
            return Ok(None);
        }
        Ok(Some(local_id))
    }

    fn default_code(&self, own_template: Option<i64>) -> ImportResult<MappedValues> {
        if self.has_combinations() {
            return Ok(MappedValues::new());
        }
        let backend = self.ctx.backend();
        let reference = non_blank(self.record, "reference");
        let base = base_code(reference.as_deref(), backend.id, &self.remote_id());
        let code = reconcile_code(&self.ctx.products(), &base, backend.company_id, own_template)?;
        if code != base {
            tracing::info!(base = %base, code = %code, "商品编码已被占用，追加后缀");
        }
        Ok(single("default_code", json!(code)))
    }

    fn categ_ids(&self) -> ImportResult<MappedValues> {
        let binder = self.ctx.binder(ModelName::ProductCategory);
        let mut category_ids: Vec<i64> = Vec::new();
        for category in association(self.record, "categories", "category") {
            let Some(remote_id) = id_of(&category) else {
                continue;
            };
            if let Some(local_id) = binder.to_local(&remote_id, true)? {
                if !category_ids.contains(&local_id) {
                    category_ids.push(local_id);
                }
            }
        }
        Ok(single("categ_ids", json!(category_ids)))
    }

    fn default_category_id(&self) -> ImportResult<MappedValues> {
        let remote_id = field_text(self.record, "id_category_default");
        if is_unset_id(remote_id.as_deref()) {
            return Ok(MappedValues::new());
        }
        let remote_id = remote_id.unwrap_or_default();
        match self
            .ctx
            .binder(ModelName::ProductCategory)
            .to_local(&remote_id, true)?
        {
            Some(category_id) => Ok(single("default_category_id", json!(category_id))),
            None => Ok(MappedValues::new()),
        }
    }
}

// ==========================================
// 无需本地查询的规则
// ==========================================

fn single(key: &str, value: Value) -> MappedValues {
    let mut values = MappedValues::new();
    values.insert(key.to_string(), value);
    values
}

/// 记录是否带有组合
pub fn has_combinations(record: &Value) -> bool {
    !association(record, "combinations", "combination").is_empty()
}

pub fn map_name(record: &Value, language: Option<&str>) -> MappedValues {
    let name = translated_field(record, "name", language)
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| "noname".to_string());
    single("name", json!(name))
}

/// 时间戳字段；未设置值替换为 now
pub fn map_dates(record: &Value, now: DateTime<Utc>) -> MappedValues {
    let mut values = MappedValues::new();
    for key in ["date_add", "date_upd"] {
        let Some(raw) = field_text(record, key) else {
            continue;
        };
        let value = if raw == UNSET_TIMESTAMP {
            now.format(TIMESTAMP_FORMAT).to_string()
        } else {
            raw
        };
        values.insert(key.to_string(), json!(value));
    }
    values
}

/// 条码: barcode 优先，其次 ean13；校验不通过时不产出
pub fn map_barcode(record: &Value) -> MappedValues {
    if has_combinations(record) {
        return MappedValues::new();
    }
    let barcode = non_blank(record, "barcode").or_else(|| non_blank(record, "ean13"));
    match barcode {
        Some(code) if code != "0" && check_ean(&code) => single("barcode", json!(code)),
        _ => MappedValues::new(),
    }
}

pub fn map_descriptions(record: &Value, language: Option<&str>) -> MappedValues {
    let short = translated_field(record, "description_short", language).unwrap_or_default();
    let long = translated_field(record, "description", language).unwrap_or_default();

    let mut values = MappedValues::new();
    values.insert("description".to_string(), json!(html_to_text(&short)));
    values.insert("description_html".to_string(), json!(sanitize_html(&long)));
    values.insert(
        "description_short_html".to_string(),
        json!(sanitize_html(&short)),
    );
    values
}

pub fn map_flags(record: &Value) -> MappedValues {
    let mut values = MappedValues::new();
    values.insert("always_available".to_string(), json!(flag(record, "active")));
    // 存在组合的模板同样可售
    values.insert("sale_ok".to_string(), json!(true));
    values.insert("purchase_ok".to_string(), json!(true));
    values
}

pub fn map_type(record: &Value) -> MappedValues {
    let product_type = match field_text(record, "type").as_deref() {
        Some("virtual") => ProductType::Service,
        _ => ProductType::Product,
    };
    single("type", json!(product_type.as_str()))
}

/// 直接复制的字段
pub fn map_direct(record: &Value, language: Option<&str>) -> MappedValues {
    let mut values = MappedValues::new();

    if let Some(weight) = field_text(record, "weight").and_then(|w| parse_price(&w)) {
        values.insert("weight".to_string(), json!(weight));
    }
    if let Some(wholesale) = field_text(record, "wholesale_price").and_then(|w| parse_price(&w)) {
        values.insert("wholesale_price".to_string(), json!(wholesale));
        values.insert("standard_price".to_string(), json!(wholesale));
    }
    if let Some(link_rewrite) = translated_field(record, "link_rewrite", language) {
        values.insert("link_rewrite".to_string(), json!(link_rewrite));
    }
    if let Some(reference) = field_text(record, "reference") {
        values.insert("reference".to_string(), json!(reference));
    }
    for key in ["available_for_order", "on_sale"] {
        if record.get(key).is_some() {
            values.insert(key.to_string(), json!(flag(record, key)));
        }
    }
    values
}
