// ==========================================
// TIKTUY 批量导入 - 领域模型层
// ==========================================
// 职责: 定义预览行、参照数据、对账与通知实体
// 红线: 不含网络访问逻辑
// ==========================================

pub mod cuadre;
pub mod notification;
pub mod preview;
pub mod reference;
pub mod types;

// 重导出核心类型
pub use cuadre::{CuadreEstado, CuadreRow, Voucher};
pub use notification::Notification;
pub use preview::{round_money, LineItem, OrderGroup, ProductRow};
pub use reference::{
    Almacen, Categoria, Courier, Named, Producto, ReferenceKind, ReferenceSets, ReferenceTable,
    Sede, SourceStatus, Zona,
};
pub use types::{FieldIssue, FieldKey, ImportKind, IssueKind, Role, ValidationOutcome};
