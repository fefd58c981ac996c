// ==========================================
// TIKTUY 批量导入 - 核心库
// ==========================================
// 职责: 订单/商品表格批量导入的预览、校验、修正与提交
// 技术栈: Rust + tokio + reqwest
// 系统定位: 客户端逻辑（最终提交由后端原子处理）
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "es");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 预览行与参照数据
pub mod domain;

// 导入层 - 预览/校验/提交
pub mod importer;

// 配置层 - 客户端配置
pub mod config;

// API 层 - 后端接口
pub mod api;

// 通知列表
pub mod notifications;

// 对账批量重新校验
pub mod cuadre;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{FieldIssue, FieldKey, ImportKind, IssueKind, Role, ValidationOutcome};

// 领域实体
pub use domain::{LineItem, OrderGroup, ProductRow, ReferenceSets};

// 导入流程
pub use importer::{
    ImportError, ImportResult, OrderImportWorkflow, ProductImportWorkflow, ReviewSession,
    ReviewState, SelectionState, SubmitError,
};

// API
pub use api::{ApiError, Session, TiktuyApiClient};

// 配置
pub use config::{ClientConfig, ConfigManager};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "TIKTUY Importación Masiva";
