// ==========================================
// 商品同步连接器 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod attribute_repo;
pub mod backend_repo;
pub mod binding_repo;
pub mod category_repo;
pub mod checkpoint_repo;
pub mod error;
pub mod image_repo;
pub mod product_repo;
pub mod stock_repo;
pub mod supplier_repo;
pub mod tax_repo;

// 重导出核心仓储
pub use attribute_repo::AttributeRepository;
pub use backend_repo::BackendRepository;
pub use binding_repo::Binder;
pub use category_repo::{CategoryEntity, CategoryRepository, CategoryValues};
pub use checkpoint_repo::CheckpointRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use image_repo::{ImageRepository, ImageValues};
pub use product_repo::ProductRepository;
pub use stock_repo::StockRepository;
pub use supplier_repo::SupplierRepository;
pub use tax_repo::{TaxEntity, TaxRepository};
