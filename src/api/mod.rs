// ==========================================
// TIKTUY 批量导入 - API 层
// ==========================================
// 职责: 后端 REST 接口访问（会话显式传入）
// ==========================================

pub mod client;
pub mod dto;
pub mod error;
pub mod session;

// 重导出核心类型
pub use client::TiktuyApiClient;
pub use dto::{CommitSummary, CuadreAck, OrderCommitRequest, ProductCommitRequest};
pub use error::{ApiError, ApiResult};
pub use session::Session;
