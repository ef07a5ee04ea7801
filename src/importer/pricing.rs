// ==========================================
// 商品同步连接器 - 价格与税
// ==========================================
// 规则:
// - factor = 1 + rate / 100
// - 后端含税 且 税不含税 → price / factor
// - 后端不含税 且 税含税 → price * factor
// - 两者一致 → 原样
// ==========================================

use crate::repository::tax_repo::TaxEntity;

/// 税组的等效税
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectiveTax {
    /// 合计税率（百分比）
    pub rate: f64,
    /// 全部组成税均含税时为 true
    pub price_include: bool,
}

impl EffectiveTax {
    /// 由税组内的税合并；空税组返回 None
    pub fn from_taxes(taxes: &[TaxEntity]) -> Option<Self> {
        if taxes.is_empty() {
            return None;
        }
        Some(Self {
            rate: taxes.iter().map(|t| t.amount).sum(),
            price_include: taxes.iter().all(|t| t.price_include),
        })
    }

    pub fn factor(&self) -> f64 {
        1.0 + self.rate / 100.0
    }
}

/// 解析报价
///
/// - 空串 → 0.0
/// - 无法解析 → None
pub fn parse_price(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Some(0.0);
    }
    trimmed.parse::<f64>().ok().filter(|p| p.is_finite())
}

/// 按后端含税策略调整价格
///
/// # 参数
/// - price: 远程报价
/// - backend_taxes_included: 后端价格是否含税
/// - tax: 税组的等效税；None 表示税组未解析，不做调整
pub fn apply_taxes(price: f64, backend_taxes_included: bool, tax: Option<&EffectiveTax>) -> f64 {
    let Some(tax) = tax else {
        return price;
    };
    if backend_taxes_included == tax.price_include {
        return price;
    }
    if backend_taxes_included {
        price / tax.factor()
    } else {
        price * tax.factor()
    }
}
