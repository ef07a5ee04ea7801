// ==========================================
// 商品同步连接器 - 后端上下文
// ==========================================
// 职责: 一次导入运行所需的后端/公司/语言设置
// 说明: 加载后不可变，以 Arc 形式传入各组件构造函数
// ==========================================

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendContext {
    pub id: i64,
    pub name: String,
    pub api_url: String,
    pub api_key: String,
    pub company_id: i64,
    /// 多语言字段取值所用语言 id
    pub language_id: Option<String>,
    /// 后端价格是否含税
    pub taxes_included: bool,
    /// 库存写入的本地库位
    pub stock_location_id: i64,
    /// 上次增量导入商品的时间
    pub import_products_since: Option<String>,
}

/// 新建后端的输入
#[derive(Debug, Clone, PartialEq)]
pub struct NewBackend {
    pub name: String,
    pub api_url: String,
    pub api_key: String,
    pub company_id: i64,
    pub language_id: Option<String>,
    pub taxes_included: bool,
    pub stock_location_id: i64,
}
