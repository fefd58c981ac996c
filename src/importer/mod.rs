// ==========================================
// TIKTUY 批量导入 - 导入层
// ==========================================
// 职责: 表格批量导入的预览、校验、修正与提交
// 流程: 文件 → 预览行 → 参照解析 → 行校验 → 人工修正 → 批量提交
// 支持: Excel, CSV（本地解析或后端预览）
// ==========================================

// 模块声明
pub mod bulk_apply;
pub mod conflict_handler;
pub mod data_cleaner;
pub mod error;
pub mod field_mapper;
pub mod file_parser;
pub mod import_traits;
pub mod normalize;
pub mod reference_aggregator;
pub mod resolver;
pub mod review_session;
pub mod row_validator;
pub mod submitter;
pub mod workflow;

// 重导出核心类型
pub use bulk_apply::{apply_order_patch, apply_product_patch, OrderPatch, ProductPatch, SelectionState};
pub use conflict_handler::{find_duplicate_orders, DuplicateHint};
pub use data_cleaner::DataCleaner;
pub use error::{ImportError, ImportResult};
pub use field_mapper::SpreadsheetFieldMapper;
pub use file_parser::{CsvParser, ExcelParser, RawRow, SpreadsheetFile, UniversalFileParser};
pub use normalize::{match_confidence, names_match, normalize_key};
pub use reference_aggregator::{NameOptions, ReferenceLoader};
pub use review_session::{
    LoadTicket, OrderReviewSession, ProductReviewSession, ReviewSession, ReviewState, RowSummary,
};
pub use row_validator::{PreviewRow, RowValidator};
pub use submitter::{
    prepare_order_submission, prepare_product_submission, CommitSubmitter, ImportTarget,
    SubmitError,
};
pub use workflow::{ImportServices, LocalPreviewSource, OrderImportWorkflow, ProductImportWorkflow};

// 重导出 Trait 接口
pub use import_traits::{FieldMapper, FileParser, ImportBackend, PreviewSource, ReferenceSource};
