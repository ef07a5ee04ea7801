// ==========================================
// 商品同步连接器 - 商品编码分配
// ==========================================
// 规则:
// - 基础编码: reference，缺失时为 backend_<B>_product_<id>
// - 基础编码未占用 → 直接使用
// - 否则依次探测 base_1, base_2, ... 直到未占用（后缀无上限）
// 范围: (编码, 公司)
// ==========================================

use crate::repository::error::RepositoryResult;
use crate::repository::product_repo::ProductRepository;

/// 编码占用查询
pub trait CodeIndex {
    /// 编码是否已被占用
    ///
    /// # 参数
    /// - exclude_template: 不计入的模板（本记录已绑定的本地模板）
    fn code_exists(
        &self,
        code: &str,
        company_id: i64,
        exclude_template: Option<i64>,
    ) -> RepositoryResult<bool>;
}

impl CodeIndex for ProductRepository {
    fn code_exists(
        &self,
        code: &str,
        company_id: i64,
        exclude_template: Option<i64>,
    ) -> RepositoryResult<bool> {
        self.code_taken(code, company_id, exclude_template)
    }
}

/// 基础编码
pub fn base_code(reference: Option<&str>, backend_id: i64, remote_id: &str) -> String {
    match reference.map(str::trim).filter(|r| !r.is_empty()) {
        Some(reference) => reference.to_string(),
        None => format!("backend_{}_product_{}", backend_id, remote_id.trim()),
    }
}

/// 分配公司范围内未占用的编码
pub fn reconcile_code<I: CodeIndex + ?Sized>(
    index: &I,
    base: &str,
    company_id: i64,
    exclude_template: Option<i64>,
) -> RepositoryResult<String> {
    if !index.code_exists(base, company_id, exclude_template)? {
        return Ok(base.to_string());
    }
    let mut suffix: u64 = 1;
    loop {
        let candidate = format!("{}_{}", base, suffix);
        if !index.code_exists(&candidate, company_id, exclude_template)? {
            return Ok(candidate);
        }
        suffix += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashSet;

    #[derive(Default)]
    struct SetIndex {
        codes: RefCell<HashSet<(String, i64)>>,
    }

    impl CodeIndex for SetIndex {
        fn code_exists(&self, code: &str, company_id: i64, _: Option<i64>) -> RepositoryResult<bool> {
            Ok(self.codes.borrow().contains(&(code.to_string(), company_id)))
        }
    }

    #[test]
    fn test_base_code() {
        assert_eq!(base_code(Some("REF-1"), 2, "5"), "REF-1");
        assert_eq!(base_code(Some("  "), 2, "5"), "backend_2_product_5");
        assert_eq!(base_code(None, 2, "5"), "backend_2_product_5");
    }

    #[test]
    fn test_collisions_follow_suffix_pattern() {
        let index = SetIndex::default();
        let mut generated = Vec::new();
        for _ in 0..5 {
            let code = reconcile_code(&index, "SHIRT", 1, None).unwrap();
            index.codes.borrow_mut().insert((code.clone(), 1));
            generated.push(code);
        }
        assert_eq!(generated, vec!["SHIRT", "SHIRT_1", "SHIRT_2", "SHIRT_3", "SHIRT_4"]);
    }

    #[test]
    fn test_scope_is_per_company() {
        let index = SetIndex::default();
        index.codes.borrow_mut().insert(("SHIRT".to_string(), 1));
        assert_eq!(reconcile_code(&index, "SHIRT", 2, None).unwrap(), "SHIRT");
    }
}
