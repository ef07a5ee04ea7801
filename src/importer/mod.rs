// ==========================================
// 商品同步连接器 - 导入层
// ==========================================
// 职责: 远程记录 → 本地实体
// - 字段映射 (template_mapper + extension)
// - 依赖解析 (dependency)
// - 编码分配 (code_reconciler)
// - 导入后处理 (template_importer)
// - 库存同步 (inventory_importer)
// ==========================================

pub mod attribute_importer;
pub mod barcode;
pub mod batch_importer;
pub mod category_importer;
pub mod code_reconciler;
pub mod combination_importer;
pub mod context;
pub mod dependency;
pub mod error;
pub mod extension;
pub mod html;
pub mod image_importer;
pub mod inventory_importer;
pub mod pricing;
pub mod supplier_importer;
pub mod template_importer;
pub mod template_mapper;

// 重导出核心类型
pub use batch_importer::{import_products, run_delayed, run_direct};
pub use context::ImportContext;
pub use dependency::{import_dependency, import_record, importer_for, RecordImporter};
pub use error::{ImportError, ImportResult};
pub use extension::{
    ExtensionGroup, ExtensionRegistry, ManufacturerDependency, MapperExtension, MapperInput,
};
pub use image_importer::{import_product_image, set_product_image_variant};
pub use inventory_importer::import_inventory;
pub use supplier_importer::import_supplierinfo;
pub use template_importer::import_template;
pub use template_mapper::TemplateMapper;
