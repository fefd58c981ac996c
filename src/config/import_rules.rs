// ==========================================
// TIKTUY 批量导入 - 导入规则读取 Trait
// ==========================================
// 职责: 定义提交阶段所需的规则读取接口
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use serde::{Deserialize, Serialize};

/// 导入规则
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportRules {
    /// 单次导入最大行数
    pub max_rows: usize,
    /// 订单导入是否要求选择 courier（仅对 admin/ecommerce 角色生效）
    pub require_courier_for_orders: bool,
}

impl Default for ImportRules {
    fn default() -> Self {
        Self {
            max_rows: 500,
            require_courier_for_orders: true,
        }
    }
}

// ==========================================
// ImportRulesReader Trait
// ==========================================
// 实现者: ClientConfig；测试中可替换为固定规则
pub trait ImportRulesReader: Send + Sync {
    fn import_rules(&self) -> ImportRules;
}

impl ImportRulesReader for ImportRules {
    fn import_rules(&self) -> ImportRules {
        self.clone()
    }
}
