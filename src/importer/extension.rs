// ==========================================
// 商品同步连接器 - 映射扩展链
// ==========================================
// 职责: 特性 (features) / 制造商 (manufacturer) 字段组的可插拔映射
// 注册: inventory 在启动时收集；测试中可显式注册
// 顺序: sequence 升序，同序按注册先后；后执行者覆盖同名字段
// ==========================================

use crate::domain::backend::BackendContext;
use crate::domain::product::MappedValues;
use crate::importer::context::ImportContext;
use crate::importer::error::ImportResult;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

/// 扩展所属字段组
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtensionGroup {
    Features,
    Manufacturer,
}

impl fmt::Display for ExtensionGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtensionGroup::Features => write!(f, "features"),
            ExtensionGroup::Manufacturer => write!(f, "manufacturer"),
        }
    }
}

/// 扩展映射器的输入
pub struct MapperInput<'a> {
    pub record: &'a Value,
    pub backend: &'a BackendContext,
}

/// 扩展映射器
pub trait MapperExtension: Send + Sync {
    fn name(&self) -> &str;

    fn group(&self) -> ExtensionGroup;

    /// 产出附加字段；默认实现不产出任何字段
    fn map(&self, input: &MapperInput<'_>) -> MappedValues;
}

/// 制造商依赖导入（映射前执行）
#[async_trait]
pub trait ManufacturerDependency: Send + Sync {
    async fn import(&self, ctx: &ImportContext, record: &Value) -> ImportResult<()>;
}

// ==========================================
// 默认实现
// ==========================================

/// 特性字段组的默认映射器
#[derive(Debug, Default)]
pub struct FeaturesMapper;

impl MapperExtension for FeaturesMapper {
    fn name(&self) -> &str {
        "features"
    }

    fn group(&self) -> ExtensionGroup {
        ExtensionGroup::Features
    }

    fn map(&self, _input: &MapperInput<'_>) -> MappedValues {
        MappedValues::new()
    }
}

/// 制造商字段组的默认映射器
#[derive(Debug, Default)]
pub struct ManufacturerMapper;

impl MapperExtension for ManufacturerMapper {
    fn name(&self) -> &str {
        "manufacturer"
    }

    fn group(&self) -> ExtensionGroup {
        ExtensionGroup::Manufacturer
    }

    fn map(&self, _input: &MapperInput<'_>) -> MappedValues {
        MappedValues::new()
    }
}

#[derive(Debug, Default)]
pub struct NoManufacturerDependency;

#[async_trait]
impl ManufacturerDependency for NoManufacturerDependency {
    async fn import(&self, _ctx: &ImportContext, _record: &Value) -> ImportResult<()> {
        Ok(())
    }
}

// ==========================================
// 启动期注册
// ==========================================

/// 扩展映射器注册项（由 inventory 收集）
pub struct MapperExtensionRegistration {
    pub name: &'static str,
    pub sequence: i32,
    pub constructor: fn() -> Box<dyn MapperExtension>,
}

impl MapperExtensionRegistration {
    pub const fn new(
        name: &'static str,
        sequence: i32,
        constructor: fn() -> Box<dyn MapperExtension>,
    ) -> Self {
        Self {
            name,
            sequence,
            constructor,
        }
    }
}

inventory::collect!(MapperExtensionRegistration);

/// 注册扩展映射器
///
/// ```ignore
/// register_mapper_extension!("brand", 20, || Box::new(BrandMapper::default()));
/// ```
#[macro_export]
macro_rules! register_mapper_extension {
    ($name:expr, $sequence:expr, $constructor:expr) => {
        inventory::submit! {
            $crate::importer::extension::MapperExtensionRegistration::new(
                $name,
                $sequence,
                $constructor
            )
        }
    };
}

register_mapper_extension!("features", 0, || Box::new(FeaturesMapper));
register_mapper_extension!("manufacturer", 0, || Box::new(ManufacturerMapper));

// ==========================================
// ExtensionRegistry - 扩展链
// ==========================================
pub struct ExtensionRegistry {
    mappers: Vec<RegisteredMapper>,
    manufacturer: Box<dyn ManufacturerDependency>,
}

struct RegisteredMapper {
    sequence: i32,
    name: String,
    extension: Box<dyn MapperExtension>,
}

impl Default for ExtensionRegistry {
    fn default() -> Self {
        Self::empty()
    }
}

impl ExtensionRegistry {
    /// 空链（无映射器，制造商依赖为空操作）
    pub fn empty() -> Self {
        Self {
            mappers: Vec::new(),
            manufacturer: Box::new(NoManufacturerDependency),
        }
    }

    /// 由启动期注册项构建
    pub fn from_inventory() -> Self {
        let mut registrations: Vec<&MapperExtensionRegistration> =
            inventory::iter::<MapperExtensionRegistration>().collect();
        // inventory 的遍历顺序不固定
        registrations.sort_by(|a, b| (a.sequence, a.name).cmp(&(b.sequence, b.name)));

        let mut registry = Self::empty();
        for registration in registrations {
            registry = registry.register(registration.sequence, (registration.constructor)());
            tracing::debug!(name = registration.name, "映射扩展已注册");
        }
        registry
    }

    /// 显式注册；同 sequence 时排在已注册者之后
    pub fn register(mut self, sequence: i32, extension: Box<dyn MapperExtension>) -> Self {
        let name = extension.name().to_string();
        let position = self
            .mappers
            .iter()
            .position(|m| m.sequence > sequence)
            .unwrap_or(self.mappers.len());
        self.mappers.insert(
            position,
            RegisteredMapper {
                sequence,
                name,
                extension,
            },
        );
        self
    }

    pub fn with_manufacturer_dependency(mut self, dependency: Box<dyn ManufacturerDependency>) -> Self {
        self.manufacturer = dependency;
        self
    }

    pub fn manufacturer(&self) -> &dyn ManufacturerDependency {
        self.manufacturer.as_ref()
    }

    /// 已注册映射器名称（执行顺序）
    pub fn names(&self) -> Vec<&str> {
        self.mappers.iter().map(|m| m.name.as_str()).collect()
    }

    /// 依次执行映射器，合并到 values（后者覆盖前者）
    pub fn apply(&self, input: &MapperInput<'_>, values: &mut MappedValues) {
        for mapper in &self.mappers {
            let produced = mapper.extension.map(input);
            if !produced.is_empty() {
                tracing::debug!(
                    name = %mapper.name,
                    group = %mapper.extension.group(),
                    fields = produced.len(),
                    "扩展映射器产出字段"
                );
            }
            values.extend(produced);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct FixedMapper {
        name: &'static str,
        values: MappedValues,
    }

    impl MapperExtension for FixedMapper {
        fn name(&self) -> &str {
            self.name
        }

        fn group(&self) -> ExtensionGroup {
            ExtensionGroup::Features
        }

        fn map(&self, _input: &MapperInput<'_>) -> MappedValues {
            self.values.clone()
        }
    }

    fn fixed(name: &'static str, pairs: &[(&str, Value)]) -> Box<dyn MapperExtension> {
        Box::new(FixedMapper {
            name,
            values: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        })
    }

    fn backend() -> BackendContext {
        BackendContext {
            id: 1,
            name: "shop".to_string(),
            api_url: "http://shop.local/api".to_string(),
            api_key: "KEY".to_string(),
            company_id: 1,
            language_id: None,
            taxes_included: false,
            stock_location_id: 1,
            import_products_since: None,
        }
    }

    #[test]
    fn test_inventory_defaults_contribute_nothing() {
        let registry = ExtensionRegistry::from_inventory();
        assert!(registry.names().contains(&"features"));
        assert!(registry.names().contains(&"manufacturer"));

        let backend = backend();
        let record = json!({"id": "5"});
        let mut values = MappedValues::new();
        registry.apply(
            &MapperInput {
                record: &record,
                backend: &backend,
            },
            &mut values,
        );
        assert!(values.is_empty());
    }

    #[test]
    fn test_later_registration_overwrites() {
        let registry = ExtensionRegistry::empty()
            .register(10, fixed("origin", &[("brand", json!("B")), ("origin", json!("FR"))]))
            .register(10, fixed("brand", &[("brand", json!("A"))]))
            .register(5, fixed("early", &[("brand", json!("Z")), ("color", json!("red"))]));
        assert_eq!(registry.names(), vec!["early", "origin", "brand"]);

        let backend = backend();
        let record = json!({});
        let mut values = MappedValues::new();
        registry.apply(
            &MapperInput {
                record: &record,
                backend: &backend,
            },
            &mut values,
        );
        assert_eq!(values.get("brand"), Some(&json!("A")));
        assert_eq!(values.get("color"), Some(&json!("red")));
        assert_eq!(values.get("origin"), Some(&json!("FR")));
    }
}
