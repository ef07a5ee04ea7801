// ==========================================
// 商品同步连接器 - 商品领域模型
// ==========================================
// 职责: 定义映射结果与本地实体结构
// 流程: 远程记录 → MappedValues → TemplateValues → product_template
// ==========================================

use crate::domain::types::ProductType;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// 映射输出: 本地字段名 → 值
///
/// 字段缺失表示“不写入”（与写入 null 不同）
pub type MappedValues = serde_json::Map<String, Value>;

// ==========================================
// TemplateValues - 模板写入值
// ==========================================
// 所有字段可选: None 表示本次映射未产出该字段，更新时保留原值
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateValues {
    /// 首次创建时绑定到的已有本地模板（按编码匹配）
    #[serde(default)]
    pub local_id: Option<i64>,
    #[serde(default)]
    pub backend_id: Option<i64>,
    #[serde(default)]
    pub company_id: Option<i64>,

    // 基础信息
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub default_code: Option<String>,
    #[serde(default)]
    pub barcode: Option<String>,
    #[serde(default, rename = "type")]
    pub product_type: Option<ProductType>,

    // 价格
    #[serde(default)]
    pub list_price: Option<f64>,
    #[serde(default)]
    pub standard_price: Option<f64>,
    #[serde(default)]
    pub wholesale_price: Option<f64>,
    #[serde(default)]
    pub weight: Option<f64>,

    // 描述
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub description_html: Option<String>,
    #[serde(default)]
    pub description_short_html: Option<String>,

    // 标志
    #[serde(default)]
    pub always_available: Option<bool>,
    #[serde(default)]
    pub sale_ok: Option<bool>,
    #[serde(default)]
    pub purchase_ok: Option<bool>,
    #[serde(default)]
    pub available_for_order: Option<bool>,
    #[serde(default)]
    pub on_sale: Option<bool>,

    // 关系（整体替换）
    #[serde(default)]
    pub categ_ids: Option<Vec<i64>>,
    #[serde(default)]
    pub default_category_id: Option<i64>,
    #[serde(default)]
    pub taxes_id: Option<Vec<i64>>,

    // 其他
    #[serde(default)]
    pub link_rewrite: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub tags: Option<String>,
    #[serde(default)]
    pub date_add: Option<String>,
    #[serde(default)]
    pub date_upd: Option<String>,

    /// 扩展映射器产出的其他字段
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl TemplateValues {
    pub fn from_mapped(values: MappedValues) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(values))
    }
}

/// 本地商品模板（读取视图）
#[derive(Debug, Clone, PartialEq)]
pub struct ProductTemplate {
    pub id: i64,
    pub name: String,
    pub default_code: Option<String>,
    pub barcode: Option<String>,
    pub list_price: f64,
    pub product_type: ProductType,
    pub always_available: bool,
    pub sale_ok: bool,
    pub purchase_ok: bool,
    pub default_category_id: Option<i64>,
    pub company_id: i64,
    pub description: Option<String>,
    pub description_html: Option<String>,
    pub tags: Option<String>,
    pub date_add: Option<String>,
    pub date_upd: Option<String>,
    pub extra: BTreeMap<String, Value>,
}

// ==========================================
// 变体
// ==========================================

/// 变体写入值
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariantValues {
    pub template_id: i64,
    pub default_code: Option<String>,
    pub barcode: Option<String>,
    pub price_extra: f64,
    pub active: bool,
}

/// 属性值引用（值 id + 所属属性 id）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttributeValueRef {
    pub value_id: i64,
    pub attribute_id: i64,
}

/// 本地变体（读取视图）
#[derive(Debug, Clone, PartialEq)]
pub struct ProductVariant {
    pub id: i64,
    pub template_id: i64,
    pub default_code: Option<String>,
    pub barcode: Option<String>,
    pub price_extra: f64,
    pub active: bool,
    pub attribute_values: Vec<AttributeValueRef>,
}

/// 模板级属性行
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeLine {
    pub id: i64,
    pub template_id: i64,
    pub attribute_id: i64,
    pub value_ids: Vec<i64>,
}

// ==========================================
// 供应商信息
// ==========================================

#[derive(Debug, Clone, PartialEq)]
pub struct SupplierInfoValues {
    pub template_id: i64,
    pub supplier_id: i64,
    pub product_code: Option<String>,
    pub price: f64,
}

// ==========================================
// 检查点
// ==========================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Checkpoint {
    pub id: i64,
    pub backend_id: i64,
    pub model: String,
    pub record_id: i64,
    pub message: String,
    pub reviewed: bool,
    pub created_at: String,
}
