// ==========================================
// 商品同步连接器 - 任务定义
// ==========================================
// 每个任务是一个可独立执行、可重试的工作单元
// 优先级: 数值越小越先执行
// ==========================================

use crate::domain::types::ModelName;
use crate::remote::Filters;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 默认优先级
pub const PRIORITY_DEFAULT: i32 = 10;
/// 商品图片导入（较高）
pub const PRIORITY_PRODUCT_IMAGE: i32 = 10;
/// 变体图片分配 / 批量导入中的单条任务（中等）
pub const PRIORITY_MEDIUM: i32 = 15;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConnectorJob {
    /// 增量导入分类与商品
    ImportProducts { since: Option<String> },
    /// 某模型的批量导入
    ImportBatch {
        model: ModelName,
        #[serde(default)]
        filters: Filters,
    },
    /// 单条记录导入（record 为批量阶段已取得的摘要）
    ImportRecord {
        model: ModelName,
        remote_id: String,
        #[serde(default)]
        record: Option<Value>,
    },
    ImportProductImage { product_id: String, image_id: String },
    /// 为一批组合分配变体图片
    SetProductImageVariant { combinations: Vec<String> },
    ImportInventory,
    ImportSupplierInfo { product_id: String },
}

impl ConnectorJob {
    pub fn kind(&self) -> &'static str {
        match self {
            ConnectorJob::ImportProducts { .. } => "import_products",
            ConnectorJob::ImportBatch { .. } => "import_batch",
            ConnectorJob::ImportRecord { .. } => "import_record",
            ConnectorJob::ImportProductImage { .. } => "import_product_image",
            ConnectorJob::SetProductImageVariant { .. } => "set_product_image_variant",
            ConnectorJob::ImportInventory => "import_inventory",
            ConnectorJob::ImportSupplierInfo { .. } => "import_supplier_info",
        }
    }

    /// 去重键: 同一键同时至多一个 PENDING 任务
    pub fn identity_key(&self) -> String {
        match self {
            ConnectorJob::ImportProducts { since } => {
                format!("import_products:{}", since.as_deref().unwrap_or(""))
            }
            ConnectorJob::ImportBatch { model, filters } => {
                let filters = filters
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, v))
                    .collect::<Vec<_>>()
                    .join("&");
                format!("import_batch:{}:{}", model, filters)
            }
            ConnectorJob::ImportRecord {
                model, remote_id, ..
            } => format!("import_record:{}:{}", model, remote_id.trim()),
            ConnectorJob::ImportProductImage {
                product_id,
                image_id,
            } => format!("import_product_image:{}:{}", product_id.trim(), image_id.trim()),
            ConnectorJob::SetProductImageVariant { combinations } => {
                format!("set_product_image_variant:{}", combinations.join(","))
            }
            ConnectorJob::ImportInventory => "import_inventory".to_string(),
            ConnectorJob::ImportSupplierInfo { product_id } => {
                format!("import_supplier_info:{}", product_id.trim())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_is_tagged() {
        let job = ConnectorJob::ImportProductImage {
            product_id: "5".to_string(),
            image_id: "7".to_string(),
        };
        let payload = serde_json::to_value(&job).unwrap();
        assert_eq!(
            payload,
            json!({"type": "import_product_image", "product_id": "5", "image_id": "7"})
        );
        assert_eq!(serde_json::from_value::<ConnectorJob>(payload).unwrap(), job);
        assert_eq!(
            serde_json::to_value(&ConnectorJob::ImportInventory).unwrap(),
            json!({"type": "import_inventory"})
        );
    }

    #[test]
    fn test_identity_key_ignores_record_payload() {
        let a = ConnectorJob::ImportRecord {
            model: ModelName::StockAvailable,
            remote_id: "3".to_string(),
            record: Some(json!({"id": "3"})),
        };
        let b = ConnectorJob::ImportRecord {
            model: ModelName::StockAvailable,
            remote_id: "3".to_string(),
            record: None,
        };
        assert_eq!(a.identity_key(), b.identity_key());
        assert_eq!(a.identity_key(), "import_record:stock.available:3");
    }
}
