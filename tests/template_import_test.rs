// ==========================================
// 商品模板导入集成测试
// ==========================================
// 测试目标: 字段映射、编码分配、组合导入顺序、导入后处理
// ==========================================

mod test_helpers;

use async_trait::async_trait;
use catalog_sync::domain::product::MappedValues;
use catalog_sync::domain::record::field_text;
use catalog_sync::domain::{ModelName, ProductType, TemplateValues};
use catalog_sync::importer::code_reconciler::reconcile_code;
use catalog_sync::importer::template_importer::DEFAULT_CATEGORY_MISSING;
use catalog_sync::importer::{
    import_template, ExtensionGroup, ExtensionRegistry, ImportContext, ImportError, ImportResult,
    ManufacturerDependency, MapperExtension, MapperInput,
};
use catalog_sync::jobs::{ConnectorJob, JobStatus};
use catalog_sync::logging;
use catalog_sync::remote::memory_adapter::InjectedFailure;
use catalog_sync::remote::MemoryAdapter;
use chrono::{NaiveDateTime, Utc};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

#[tokio::test]
async fn test_empty_name_and_reference_scenario() {
    logging::init_test();
    let (_temp_file, conn) = test_helpers::create_test_db().expect("Failed to create test db");
    let backend = test_helpers::create_backend(&conn, false);
    let adapter = Arc::new(MemoryAdapter::new());
    let ctx = test_helpers::create_context(&conn, &backend, adapter.clone());

    // 20% 不含税，与后端策略一致
    let tax_id = ctx.taxes().create_tax("VAT 20", 20.0, false).unwrap();
    let group_id = ctx.taxes().create_group("Standard", &[tax_id]).unwrap();
    ctx.binder(ModelName::TaxGroup).bind("1", group_id).unwrap();

    let mut record = test_helpers::product("5", "10.00");
    record["name"] = json!("");
    record["type"] = json!({"value": "standard"});
    record["id_tax_rules_group"] = json!("1");
    adapter.insert("products", record).unwrap();

    let template_id = import_template(&ctx, "5", None).await.unwrap();
    let template = ctx.products().get_template(template_id).unwrap();

    assert_eq!(template.name, "noname");
    assert!((template.list_price - 10.0).abs() < 1e-9);
    assert_eq!(
        template.default_code,
        Some(format!("backend_{}_product_5", backend.id))
    );
    assert_eq!(template.product_type, ProductType::Product);
    assert!(template.always_available);
    assert!(template.sale_ok);
    assert_eq!(ctx.products().template_taxes(template_id).unwrap(), vec![tax_id]);
    assert_eq!(
        ctx.binder(ModelName::ProductTemplate).to_local("5", true).unwrap(),
        Some(template_id)
    );
}

#[tokio::test]
async fn test_tax_included_backend_divides_exclusive_tax() {
    logging::init_test();
    let (_temp_file, conn) = test_helpers::create_test_db().expect("Failed to create test db");
    let backend = test_helpers::create_backend(&conn, true);
    let adapter = Arc::new(MemoryAdapter::new());
    let ctx = test_helpers::create_context(&conn, &backend, adapter.clone());

    let tax_id = ctx.taxes().create_tax("VAT 20", 20.0, false).unwrap();
    let group_id = ctx.taxes().create_group("Standard", &[tax_id]).unwrap();
    ctx.binder(ModelName::TaxGroup).bind("9", group_id).unwrap();

    let mut record = test_helpers::product("8", "120.00");
    record["id_tax_rules_group"] = json!("9");
    adapter.insert("products", record).unwrap();

    let template_id = import_template(&ctx, "8", None).await.unwrap();
    let template = ctx.products().get_template(template_id).unwrap();
    assert!((template.list_price - 100.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_unset_timestamp_replaced_with_import_time() {
    logging::init_test();
    let (_temp_file, conn) = test_helpers::create_test_db().expect("Failed to create test db");
    let backend = test_helpers::create_backend(&conn, false);
    let adapter = Arc::new(MemoryAdapter::new());
    let ctx = test_helpers::create_context(&conn, &backend, adapter.clone());

    let mut record = test_helpers::product("3", "1");
    record["date_add"] = json!("0000-00-00 00:00:00");
    adapter.insert("products", record).unwrap();

    // 秒级精度
    let before = Utc::now().timestamp();
    let template_id = import_template(&ctx, "3", None).await.unwrap();
    let template = ctx.products().get_template(template_id).unwrap();

    let date_add = template.date_add.expect("date_add mapped");
    let parsed = NaiveDateTime::parse_from_str(&date_add, "%Y-%m-%d %H:%M:%S").unwrap();
    assert!(parsed.and_utc().timestamp() >= before);
    assert_eq!(template.date_upd.as_deref(), Some("2024-01-02 03:04:05"));
}

#[tokio::test]
async fn test_code_collisions_get_numeric_suffix() {
    logging::init_test();
    let (_temp_file, conn) = test_helpers::create_test_db().expect("Failed to create test db");
    let backend = test_helpers::create_backend(&conn, false);
    let adapter = Arc::new(MemoryAdapter::new());
    let ctx = test_helpers::create_context(&conn, &backend, adapter.clone());
    let products = ctx.products();

    // 连续分配: base, base_1, base_2
    let mut codes = Vec::new();
    for _ in 0..3 {
        let code = reconcile_code(&products, "base", 1, None).unwrap();
        products
            .create_template(&TemplateValues {
                name: Some("existing".to_string()),
                default_code: Some(code.clone()),
                company_id: Some(1),
                ..Default::default()
            })
            .unwrap();
        codes.push(code);
    }
    assert_eq!(codes, vec!["base", "base_1", "base_2"]);

    // 生成的基础编码已被手工建档占用
    let base = format!("backend_{}_product_5", backend.id);
    for code in [base.clone(), format!("{}_1", base)] {
        products
            .create_template(&TemplateValues {
                name: Some("manual".to_string()),
                default_code: Some(code),
                company_id: Some(1),
                ..Default::default()
            })
            .unwrap();
    }
    adapter
        .insert("products", test_helpers::product("5", "4"))
        .unwrap();

    let template_id = import_template(&ctx, "5", None).await.unwrap();
    let expected = format!("{}_2", base);
    assert_eq!(
        products.get_template(template_id).unwrap().default_code,
        Some(expected.clone())
    );

    // 再次导入不与自身冲突
    let again = import_template(&ctx, "5", None).await.unwrap();
    assert_eq!(again, template_id);
    assert_eq!(products.get_template(template_id).unwrap().default_code, Some(expected));
}

#[tokio::test]
async fn test_reference_binds_existing_template_on_create() {
    logging::init_test();
    let (_temp_file, conn) = test_helpers::create_test_db().expect("Failed to create test db");
    let backend = test_helpers::create_backend(&conn, false);
    let adapter = Arc::new(MemoryAdapter::new());
    let ctx = test_helpers::create_context(&conn, &backend, adapter.clone());

    let existing = ctx
        .products()
        .create_template(&TemplateValues {
            name: Some("Mug (local)".to_string()),
            default_code: Some("MUG".to_string()),
            company_id: Some(1),
            ..Default::default()
        })
        .unwrap();

    let mut record = test_helpers::product("21", "9.90");
    record["reference"] = json!("MUG");
    adapter.insert("products", record).unwrap();

    let template_id = import_template(&ctx, "21", None).await.unwrap();
    assert_eq!(template_id, existing);
    let template = ctx.products().get_template(existing).unwrap();
    assert_eq!(template.name, "Product 21");
    assert_eq!(template.default_code.as_deref(), Some("MUG"));
}

#[tokio::test]
async fn test_shared_reference_gets_distinct_templates() {
    logging::init_test();
    let (_temp_file, conn) = test_helpers::create_test_db().expect("Failed to create test db");
    let backend = test_helpers::create_backend(&conn, false);
    let adapter = Arc::new(MemoryAdapter::new());
    let ctx = test_helpers::create_context(&conn, &backend, adapter.clone());

    for id in ["5", "6", "7"] {
        let mut record = test_helpers::product(id, "12");
        record["reference"] = json!("SHIRT");
        adapter.insert("products", record).unwrap();
    }

    let a = import_template(&ctx, "5", None).await.unwrap();
    let b = import_template(&ctx, "6", None).await.unwrap();
    let c = import_template(&ctx, "7", None).await.unwrap();
    assert_ne!(a, b);
    assert_ne!(b, c);
    assert_ne!(a, c);

    let products = ctx.products();
    let first = products.get_template(a).unwrap();
    let second = products.get_template(b).unwrap();
    let third = products.get_template(c).unwrap();
    assert_eq!(first.name, "Product 5");
    assert_eq!(first.default_code.as_deref(), Some("SHIRT"));
    assert_eq!(second.name, "Product 6");
    assert_eq!(second.default_code.as_deref(), Some("SHIRT_1"));
    assert_eq!(third.default_code.as_deref(), Some("SHIRT_2"));

    // 重新导入仍落在各自模板上
    assert_eq!(import_template(&ctx, "6", None).await.unwrap(), b);
    assert_eq!(
        products.get_template(b).unwrap().default_code.as_deref(),
        Some("SHIRT_1")
    );
}

fn tag(id: &str, name: &str) -> Value {
    json!({"id": id, "name": {"language": [{"attrs": {"id": "1"}, "value": name}]}})
}

#[tokio::test]
async fn test_tags_joined_from_list_response() {
    logging::init_test();
    let (_temp_file, conn) = test_helpers::create_test_db().expect("Failed to create test db");
    let backend = test_helpers::create_backend(&conn, false);
    let adapter = Arc::new(MemoryAdapter::new());
    let ctx = test_helpers::create_context(&conn, &backend, adapter.clone());

    adapter.insert("tags", tag("1", "eco")).unwrap();
    adapter.insert("tags", tag("2", "summer")).unwrap();
    adapter.insert("tags", tag("3", "unused")).unwrap();
    let mut record = test_helpers::product("5", "3");
    record["associations"] = json!({"tags": {"tag": [{"id": "1"}, {"id": "2"}]}});
    adapter.insert("products", record).unwrap();

    let template_id = import_template(&ctx, "5", None).await.unwrap();
    let template = ctx.products().get_template(template_id).unwrap();
    assert_eq!(template.tags.as_deref(), Some("eco,summer"));

    let (resource, query) = adapter
        .get_log()
        .into_iter()
        .find(|(resource, _)| resource == "tags")
        .expect("tags searched");
    assert_eq!(resource, "tags");
    assert_eq!(query.get("filter[id]").map(String::as_str), Some("[1|2]"));
    assert_eq!(query.get("display").map(String::as_str), Some("[name]"));
}

#[tokio::test]
async fn test_tags_from_single_object_response() {
    logging::init_test();
    let (_temp_file, conn) = test_helpers::create_test_db().expect("Failed to create test db");
    let backend = test_helpers::create_backend(&conn, false);
    let adapter = Arc::new(MemoryAdapter::new().with_single_object_listings());
    let ctx = test_helpers::create_context(&conn, &backend, adapter.clone());

    adapter.insert("tags", tag("4", "outlet")).unwrap();
    let mut record = test_helpers::product("5", "3");
    record["associations"] = json!({"tags": {"tag": {"id": "4"}}});
    adapter.insert("products", record).unwrap();

    let template_id = import_template(&ctx, "5", None).await.unwrap();
    let template = ctx.products().get_template(template_id).unwrap();
    assert_eq!(template.tags.as_deref(), Some("outlet"));
}

#[tokio::test]
async fn test_product_without_tags_has_none() {
    logging::init_test();
    let (_temp_file, conn) = test_helpers::create_test_db().expect("Failed to create test db");
    let backend = test_helpers::create_backend(&conn, false);
    let adapter = Arc::new(MemoryAdapter::new());
    let ctx = test_helpers::create_context(&conn, &backend, adapter.clone());

    adapter.insert("products", test_helpers::product("5", "3")).unwrap();
    let template_id = import_template(&ctx, "5", None).await.unwrap();
    assert_eq!(ctx.products().get_template(template_id).unwrap().tags, None);
    assert!(adapter.get_log().iter().all(|(resource, _)| resource != "tags"));
}

#[tokio::test]
async fn test_combinations_default_first_and_post_import_steps() {
    logging::init_test();
    let (_temp_file, conn) = test_helpers::create_test_db().expect("Failed to create test db");
    let backend = test_helpers::create_backend(&conn, false);
    let adapter = Arc::new(MemoryAdapter::new());
    let ctx = test_helpers::create_context(&conn, &backend, adapter.clone());

    test_helpers::insert_size_option(&adapter, &[("101", "S"), ("102", "M"), ("103", "L")]);
    adapter
        .insert("combinations", test_helpers::combination("11", "5", "101", &["50"]))
        .unwrap();
    adapter
        .insert("combinations", test_helpers::combination("12", "5", "102", &[]))
        .unwrap();
    adapter
        .insert("combinations", test_helpers::combination("13", "5", "103", &["50"]))
        .unwrap();
    adapter
        .insert_binary("images/products/5/50", vec![0x89, 0x50, 0x4e, 0x47], Some("image/png"))
        .unwrap();

    let mut record = test_helpers::product("5", "20");
    record["reference"] = json!("SHIRT");
    record["ean13"] = json!("4006381333931");
    record["id_default_combination"] = json!("12");
    record["associations"] = json!({
        "images": {"image": {"id": "50"}},
        "combinations": {"combination": [{"id": "11"}, {"id": "12"}, {"id": "13"}]}
    });
    adapter.insert("products", record).unwrap();

    let template_id = import_template(&ctx, "5", None).await.unwrap();

    // 默认组合在前
    assert_eq!(adapter.reads_of("combinations"), vec!["12", "11", "13"]);

    // 存在组合时模板不带编码与条码
    let template = ctx.products().get_template(template_id).unwrap();
    assert_eq!(template.default_code, None);
    assert_eq!(template.barcode, None);

    let pending = ctx.queue().list_jobs(JobStatus::Pending).unwrap();
    let variant_jobs: Vec<_> = pending
        .iter()
        .filter_map(|r| match &r.job {
            ConnectorJob::SetProductImageVariant { combinations } => Some(combinations.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(variant_jobs, vec![vec!["11".to_string(), "13".to_string()]]);
    assert!(pending.iter().any(|r| r.job
        == ConnectorJob::ImportProductImage {
            product_id: "5".to_string(),
            image_id: "50".to_string(),
        }));

    // 属性行: 一个属性，三个值
    let lines = ctx.products().attribute_lines(template_id).unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].value_ids.len(), 3);

    // 占位变体已停用
    let variants = ctx.products().list_variants(template_id).unwrap();
    assert_eq!(variants.len(), 4);
    for variant in &variants {
        assert_eq!(variant.active, !variant.attribute_values.is_empty());
    }

    // 重新导入不重复声明属性值
    import_template(&ctx, "5", None).await.unwrap();
    let lines = ctx.products().attribute_lines(template_id).unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].value_ids.len(), 3);
    assert_eq!(ctx.products().list_variants(template_id).unwrap().len(), 4);
}

#[tokio::test]
async fn test_default_category_service_error_creates_checkpoint() {
    logging::init_test();
    let (_temp_file, conn) = test_helpers::create_test_db().expect("Failed to create test db");
    let backend = test_helpers::create_backend(&conn, false);
    let adapter = Arc::new(MemoryAdapter::new());
    let ctx = test_helpers::create_context(&conn, &backend, adapter.clone());

    adapter.insert("categories", test_helpers::category("3", "0", "Home")).unwrap();
    adapter
        .fail_read("categories", "3", InjectedFailure::Service(500))
        .unwrap();
    adapter.insert("categories", test_helpers::category("4", "0", "Kitchen")).unwrap();

    let mut record = test_helpers::product("5", "10");
    record["id_category_default"] = json!("3");
    record["associations"] = json!({"categories": {"category": {"id": "4"}}});
    adapter.insert("products", record).unwrap();

    let template_id = import_template(&ctx, "5", None).await.unwrap();
    let template = ctx.products().get_template(template_id).unwrap();
    assert_eq!(template.default_category_id, None);

    let kitchen = ctx
        .binder(ModelName::ProductCategory)
        .to_local("4", true)
        .unwrap()
        .expect("category 4 imported");
    assert_eq!(ctx.products().template_categories(template_id).unwrap(), vec![kitchen]);

    let checkpoints = ctx.checkpoints().list(backend.id, true).unwrap();
    assert_eq!(checkpoints.len(), 1);
    assert_eq!(checkpoints[0].record_id, template_id);
    assert_eq!(checkpoints[0].model, "product.template");
    assert_eq!(checkpoints[0].message, DEFAULT_CATEGORY_MISSING);
    assert_eq!(checkpoints[0].message, "The default category could not be imported.");
}

#[tokio::test]
async fn test_default_category_transport_error_propagates() {
    logging::init_test();
    let (_temp_file, conn) = test_helpers::create_test_db().expect("Failed to create test db");
    let backend = test_helpers::create_backend(&conn, false);
    let adapter = Arc::new(MemoryAdapter::new());
    let ctx = test_helpers::create_context(&conn, &backend, adapter.clone());

    adapter
        .fail_read("categories", "3", InjectedFailure::Transport)
        .unwrap();
    let mut record = test_helpers::product("5", "10");
    record["id_category_default"] = json!("3");
    adapter.insert("products", record).unwrap();

    let err = import_template(&ctx, "5", None).await.unwrap_err();
    assert!(matches!(err, ImportError::Remote(_)));
    assert!(ctx
        .binder(ModelName::ProductTemplate)
        .to_local("5", true)
        .unwrap()
        .is_none());
    assert!(ctx.checkpoints().list(backend.id, true).unwrap().is_empty());
}

#[tokio::test]
async fn test_category_parent_imported_first() {
    logging::init_test();
    let (_temp_file, conn) = test_helpers::create_test_db().expect("Failed to create test db");
    let backend = test_helpers::create_backend(&conn, false);
    let adapter = Arc::new(MemoryAdapter::new());
    let ctx = test_helpers::create_context(&conn, &backend, adapter.clone());

    adapter.insert("categories", test_helpers::category("2", "0", "Root")).unwrap();
    adapter.insert("categories", test_helpers::category("6", "2", "Mugs")).unwrap();

    let mut record = test_helpers::product("5", "10");
    record["id_category_default"] = json!("6");
    adapter.insert("products", record).unwrap();

    let template_id = import_template(&ctx, "5", None).await.unwrap();
    let binder = ctx.binder(ModelName::ProductCategory);
    let root = binder.to_local("2", true).unwrap().expect("root imported");
    let mugs = binder.to_local("6", true).unwrap().expect("child imported");

    let child = ctx.categories().find_by_id(mugs).unwrap().expect("child row");
    assert_eq!(child.parent_id, Some(root));
    assert_eq!(child.name, "Mugs");
    assert_eq!(
        ctx.products().get_template(template_id).unwrap().default_category_id,
        Some(mugs)
    );
}

/// 把远程 manufacturer_name 写入模板附加字段
struct BrandMapper;

impl MapperExtension for BrandMapper {
    fn name(&self) -> &str {
        "brand"
    }

    fn group(&self) -> ExtensionGroup {
        ExtensionGroup::Manufacturer
    }

    fn map(&self, input: &MapperInput<'_>) -> MappedValues {
        let mut values = MappedValues::new();
        if let Some(brand) = field_text(input.record, "manufacturer_name") {
            values.insert("brand".to_string(), json!(brand));
        }
        values
    }
}

#[tokio::test]
async fn test_registered_extension_output_stored_on_template() {
    logging::init_test();
    let (_temp_file, conn) = test_helpers::create_test_db().expect("Failed to create test db");
    let backend = test_helpers::create_backend(&conn, false);
    let adapter = Arc::new(MemoryAdapter::new());
    let extensions = ExtensionRegistry::from_inventory().register(10, Box::new(BrandMapper));
    let ctx = ImportContext::new(
        Arc::new(backend.clone()),
        conn.clone(),
        adapter.clone(),
        test_helpers::create_queue(&conn),
        Arc::new(extensions),
    );

    let mut record = test_helpers::product("5", "10");
    record["manufacturer_name"] = json!("Acme");
    adapter.insert("products", record).unwrap();

    let template_id = import_template(&ctx, "5", None).await.unwrap();
    let template = ctx.products().get_template(template_id).unwrap();
    assert_eq!(template.extra.get("brand"), Some(&json!("Acme")));
}

/// 记录映射前收到的制造商 id
struct RecordingManufacturer {
    seen: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl ManufacturerDependency for RecordingManufacturer {
    async fn import(&self, ctx: &ImportContext, record: &Value) -> ImportResult<()> {
        // 映射前模板尚未绑定
        let product_id = field_text(record, "id").unwrap_or_default();
        assert!(!ctx.binder(ModelName::ProductTemplate).is_bound(&product_id)?);
        if let Some(manufacturer) = field_text(record, "id_manufacturer") {
            self.seen.lock().unwrap().push(manufacturer);
        }
        Ok(())
    }
}

#[tokio::test]
async fn test_manufacturer_dependency_runs_before_mapping() {
    logging::init_test();
    let (_temp_file, conn) = test_helpers::create_test_db().expect("Failed to create test db");
    let backend = test_helpers::create_backend(&conn, false);
    let adapter = Arc::new(MemoryAdapter::new());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let extensions = ExtensionRegistry::empty().with_manufacturer_dependency(Box::new(
        RecordingManufacturer { seen: seen.clone() },
    ));
    let ctx = ImportContext::new(
        Arc::new(backend.clone()),
        conn.clone(),
        adapter.clone(),
        test_helpers::create_queue(&conn),
        Arc::new(extensions),
    );

    let mut record = test_helpers::product("5", "10");
    record["id_manufacturer"] = json!("3");
    adapter.insert("products", record).unwrap();

    import_template(&ctx, "5", None).await.unwrap();
    assert_eq!(*seen.lock().unwrap(), vec!["3".to_string()]);
}
