// ==========================================
// 商品同步连接器 - 领域类型定义
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// 绑定模型 (Model Name)
// ==========================================
// 每个模型对应一个远程资源，用于 Binder 查表与导入分发
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ModelName {
    #[serde(rename = "product.template")]
    ProductTemplate,
    #[serde(rename = "product.combination")]
    ProductCombination,
    #[serde(rename = "product.category")]
    ProductCategory,
    #[serde(rename = "account.tax.group")]
    TaxGroup,
    #[serde(rename = "product.image")]
    ProductImage,
    #[serde(rename = "product.option")]
    ProductOption,
    #[serde(rename = "product.option.value")]
    ProductOptionValue,
    #[serde(rename = "product.supplier")]
    Supplier,
    #[serde(rename = "product.supplierinfo")]
    SupplierInfo,
    #[serde(rename = "stock.available")]
    StockAvailable,
}

impl ModelName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelName::ProductTemplate => "product.template",
            ModelName::ProductCombination => "product.combination",
            ModelName::ProductCategory => "product.category",
            ModelName::TaxGroup => "account.tax.group",
            ModelName::ProductImage => "product.image",
            ModelName::ProductOption => "product.option",
            ModelName::ProductOptionValue => "product.option.value",
            ModelName::Supplier => "product.supplier",
            ModelName::SupplierInfo => "product.supplierinfo",
            ModelName::StockAvailable => "stock.available",
        }
    }

    /// Web Service 资源名（URL 路径段）
    pub fn resource(&self) -> &'static str {
        match self {
            ModelName::ProductTemplate => "products",
            ModelName::ProductCombination => "combinations",
            ModelName::ProductCategory => "categories",
            ModelName::TaxGroup => "tax_rule_groups",
            ModelName::ProductImage => "images",
            ModelName::ProductOption => "product_options",
            ModelName::ProductOptionValue => "product_option_values",
            ModelName::Supplier => "suppliers",
            ModelName::SupplierInfo => "product_suppliers",
            ModelName::StockAvailable => "stock_availables",
        }
    }
}

impl fmt::Display for ModelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ModelName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "product.template" => Ok(ModelName::ProductTemplate),
            "product.combination" => Ok(ModelName::ProductCombination),
            "product.category" => Ok(ModelName::ProductCategory),
            "account.tax.group" => Ok(ModelName::TaxGroup),
            "product.image" => Ok(ModelName::ProductImage),
            "product.option" => Ok(ModelName::ProductOption),
            "product.option.value" => Ok(ModelName::ProductOptionValue),
            "product.supplier" => Ok(ModelName::Supplier),
            "product.supplierinfo" => Ok(ModelName::SupplierInfo),
            "stock.available" => Ok(ModelName::StockAvailable),
            other => Err(format!("未知模型: {}", other)),
        }
    }
}

// ==========================================
// 商品类型 (Product Type)
// ==========================================
// product: 实物; service: 非实物占位（虚拟商品）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductType {
    Product,
    Service,
}

impl ProductType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductType::Product => "product",
            ProductType::Service => "service",
        }
    }

    pub fn from_db(s: &str) -> Self {
        match s {
            "service" => ProductType::Service,
            _ => ProductType::Product,
        }
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
