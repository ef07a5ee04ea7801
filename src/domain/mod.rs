// ==========================================
// 商品同步连接器 - 领域层
// ==========================================
// 职责: 实体、值对象与远程记录访问
// ==========================================

pub mod backend;
pub mod product;
pub mod record;
pub mod types;

pub use backend::{BackendContext, NewBackend};
pub use product::{
    AttributeLine, AttributeValueRef, Checkpoint, MappedValues, ProductTemplate, ProductVariant,
    SupplierInfoValues, TemplateValues, VariantValues,
};
pub use record::{ensure_list, RemoteRecord};
pub use types::{ModelName, ProductType};
