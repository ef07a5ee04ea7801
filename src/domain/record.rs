// ==========================================
// 商品同步连接器 - 远程记录访问
// ==========================================
// 职责: 统一处理 Web Service 返回结构的歧义
// - 关联列表: 基数为 1 时返回裸对象而非列表
// - 标量: 字符串/数字/{"value": ..} 三种形态
// - 多语言字段: {"language": [{"attrs": {"id": ..}, "value": ..}]}
// ==========================================

use serde_json::Value;

/// 远程记录（单个实体的半结构化映射）
pub type RemoteRecord = Value;

/// 将“列表或单个对象”统一为列表
///
/// - None / null / 空字符串 → 空列表
/// - 数组 → 原样
/// - 其他（对象、标量）→ 单元素列表
pub fn ensure_list(value: Option<&Value>) -> Vec<Value> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(s)) if s.is_empty() => Vec::new(),
        Some(Value::Array(items)) => items.clone(),
        Some(other) => vec![other.clone()],
    }
}

/// 读取 associations.<group>.<key>，并统一为列表
///
/// 兼容两种包装:
/// - `{"categories": {"category": [...]}}`
/// - `{"categories": [...]}`
pub fn association(record: &Value, group: &str, key: &str) -> Vec<Value> {
    let Some(group_value) = record.get("associations").and_then(|a| a.get(group)) else {
        return Vec::new();
    };
    match group_value {
        Value::Object(map) if map.contains_key(key) => ensure_list(map.get(key)),
        other => ensure_list(Some(other)),
    }
}

/// 标量取值（字符串、数字、布尔或 {"value": ..} 包装）
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
        Value::Object(map) => map.get("value").and_then(scalar_text),
        _ => None,
    }
}

/// 读取记录字段的文本值
pub fn field_text(record: &Value, key: &str) -> Option<String> {
    record.get(key).and_then(scalar_text)
}

/// 读取字段文本并去除空白，空串视为缺失
pub fn non_blank(record: &Value, key: &str) -> Option<String> {
    field_text(record, key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// 关联项 / 记录的 id
pub fn id_of(item: &Value) -> Option<String> {
    field_text(item, "id").filter(|s| !s.is_empty())
}

/// "0"/"1" 标志 → bool；缺失或非数字视为 false
pub fn flag(record: &Value, key: &str) -> bool {
    field_text(record, key)
        .and_then(|s| s.trim().parse::<i64>().ok())
        .map(|n| n != 0)
        .unwrap_or(false)
}

/// 远程 id 是否为“空引用”（缺失、空串或 0）
pub fn is_unset_id(value: Option<&str>) -> bool {
    match value {
        None => true,
        Some(s) => s.trim().is_empty() || s.trim().parse::<i64>().map(|n| n == 0).unwrap_or(false),
    }
}

/// 多语言字段取值
///
/// # 参数
/// - value: 字段原值（纯文本或 language 列表）
/// - language_id: 后端配置的语言 id；匹配不到时取第一项
pub fn translated(value: &Value, language_id: Option<&str>) -> Option<String> {
    let Some(languages) = value.get("language") else {
        return scalar_text(value);
    };
    let entries = ensure_list(Some(languages));
    let matched = language_id.and_then(|lang| {
        entries.iter().find(|entry| {
            entry
                .get("attrs")
                .and_then(|attrs| attrs.get("id"))
                .and_then(scalar_text)
                .or_else(|| field_text(entry, "id"))
                .as_deref()
                == Some(lang)
        })
    });
    matched
        .or_else(|| entries.first())
        .and_then(|entry| entry.get("value").and_then(scalar_text).or_else(|| scalar_text(entry)))
}

/// 读取多语言字段的文本值
pub fn translated_field(record: &Value, key: &str, language_id: Option<&str>) -> Option<String> {
    record.get(key).and_then(|v| translated(v, language_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ensure_list_single_object() {
        let single = json!({"id": "7"});
        assert_eq!(ensure_list(Some(&single)), vec![json!({"id": "7"})]);
        assert!(ensure_list(None).is_empty());
        assert!(ensure_list(Some(&json!(""))).is_empty());
        assert_eq!(ensure_list(Some(&json!([1, 2]))).len(), 2);
    }

    #[test]
    fn test_association_both_shapes() {
        let wrapped = json!({"associations": {"categories": {"category": {"id": "3"}}}});
        let flat = json!({"associations": {"categories": [{"id": "3"}, {"id": "4"}]}});

        assert_eq!(association(&wrapped, "categories", "category"), vec![json!({"id": "3"})]);
        assert_eq!(association(&flat, "categories", "category").len(), 2);
        assert!(association(&json!({}), "categories", "category").is_empty());
    }

    #[test]
    fn test_scalar_text_variants() {
        assert_eq!(scalar_text(&json!("x")), Some("x".to_string()));
        assert_eq!(scalar_text(&json!(12)), Some("12".to_string()));
        assert_eq!(scalar_text(&json!({"value": "virtual"})), Some("virtual".to_string()));
        assert_eq!(scalar_text(&json!(null)), None);
    }

    #[test]
    fn test_translated_picks_language() {
        let name = json!({"language": [
            {"attrs": {"id": "1"}, "value": "Shirt"},
            {"attrs": {"id": "2"}, "value": "Chemise"}
        ]});
        assert_eq!(translated(&name, Some("2")), Some("Chemise".to_string()));
        assert_eq!(translated(&name, Some("9")), Some("Shirt".to_string()));
        assert_eq!(translated(&json!("Plain"), Some("2")), Some("Plain".to_string()));
    }

    #[test]
    fn test_is_unset_id() {
        assert!(is_unset_id(None));
        assert!(is_unset_id(Some("0")));
        assert!(is_unset_id(Some("")));
        assert!(!is_unset_id(Some("12")));
    }
}
