// ==========================================
// TIKTUY 批量导入 - 配置层
// ==========================================
// 职责: 客户端配置加载（默认值/文件/环境变量）
// ==========================================

pub mod config_manager;
pub mod import_rules;

// 重导出核心配置类型
pub use config_manager::{config_keys, ClientConfig, ConfigManager, Endpoints};
pub use import_rules::{ImportRules, ImportRulesReader};
