// ==========================================
// TIKTUY 批量导入 - 领域类型定义
// ==========================================
// 职责: 角色、导入类型、校验结果等基础类型
// ==========================================

use crate::i18n::{t, t_with_args};
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 用户角色 (Role)
// ==========================================
// 序列化格式: 小写（与后端一致）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,      // 管理员
    Courier,    // 物流公司
    Ecommerce,  // 电商客户
    Motorizado, // 骑手
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Courier => write!(f, "courier"),
            Role::Ecommerce => write!(f, "ecommerce"),
            Role::Motorizado => write!(f, "motorizado"),
        }
    }
}

impl Role {
    /// 从字符串解析角色（大小写不敏感）
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "courier" => Some(Role::Courier),
            "ecommerce" => Some(Role::Ecommerce),
            "motorizado" => Some(Role::Motorizado),
            _ => None,
        }
    }

    /// 订单导入时是否必须选择 courier
    ///
    /// courier 本身导入时 courier 由会话确定
    pub fn requires_courier_selector(&self) -> bool {
        matches!(self, Role::Admin | Role::Ecommerce)
    }
}

// ==========================================
// 导入类型 (Import Kind)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportKind {
    Orders,   // 订单导入
    Products, // 商品导入
}

impl fmt::Display for ImportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportKind::Orders => write!(f, "orders"),
            ImportKind::Products => write!(f, "products"),
        }
    }
}

impl ImportKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "orders" | "pedidos" => Some(ImportKind::Orders),
            "products" | "productos" => Some(ImportKind::Products),
            _ => None,
        }
    }
}

// ==========================================
// 字段标识 (Field Key)
// ==========================================
// 用途: 校验问题定位（行内字段高亮）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKey {
    // ===== 订单字段 =====
    Cliente,
    Sede,
    Distrito,
    Direccion,
    FechaEntrega,
    MontoTotal,
    Producto,
    Cantidad,
    PrecioUnitario,
    Items,

    // ===== 商品字段 =====
    Nombre,
    Categoria,
    Almacen,
    Precio,
    Stock,
    StockMinimo,
    Peso,
}

impl FieldKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKey::Cliente => "cliente",
            FieldKey::Sede => "sede",
            FieldKey::Distrito => "distrito",
            FieldKey::Direccion => "direccion",
            FieldKey::FechaEntrega => "fecha_entrega",
            FieldKey::MontoTotal => "monto_total",
            FieldKey::Producto => "producto",
            FieldKey::Cantidad => "cantidad",
            FieldKey::PrecioUnitario => "precio_unitario",
            FieldKey::Items => "items",
            FieldKey::Nombre => "nombre",
            FieldKey::Categoria => "categoria",
            FieldKey::Almacen => "almacen",
            FieldKey::Precio => "precio",
            FieldKey::Stock => "stock",
            FieldKey::StockMinimo => "stock_minimo",
            FieldKey::Peso => "peso",
        }
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// 问题类型 (Issue Kind)
// ==========================================
// 红线: Required（为空）与 NotFound（未匹配）必须区分，前端展示不同
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IssueKind {
    Required,                      // 必填为空
    NotFound,                      // 参照数据中未找到
    NotFinite,                     // 非有限数值
    Negative,                      // 负数
    Zero,                          // 数量为 0
    NotInteger,                    // 非整数
    ExceedsStock { stock: f64 },   // 超出库存
    InvalidDate,                   // 日期无法解析
}

impl IssueKind {
    /// 稳定的错误代码（用于错误列表和测试断言）
    pub fn code(&self) -> &'static str {
        match self {
            IssueKind::Required => "required",
            IssueKind::NotFound => "not_found",
            IssueKind::NotFinite => "not_finite",
            IssueKind::Negative => "negative",
            IssueKind::Zero => "zero",
            IssueKind::NotInteger => "not_integer",
            IssueKind::ExceedsStock { .. } => "exceeds_stock",
            IssueKind::InvalidDate => "invalid_date",
        }
    }
}

// ==========================================
// FieldIssue - 单个字段校验问题
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldIssue {
    pub field: FieldKey,
    pub item_index: Option<usize>, // 明细行下标（仅订单明细字段）
    #[serde(flatten)]
    pub kind: IssueKind,
}

impl FieldIssue {
    pub fn new(field: FieldKey, kind: IssueKind) -> Self {
        Self {
            field,
            item_index: None,
            kind,
        }
    }

    pub fn on_item(field: FieldKey, item_index: usize, kind: IssueKind) -> Self {
        Self {
            field,
            item_index: Some(item_index),
            kind,
        }
    }

    /// 面向用户的本地化提示
    pub fn message(&self) -> String {
        match self.kind {
            IssueKind::ExceedsStock { stock } => t_with_args(
                "validation.exceeds_stock",
                &[("stock", stock.to_string().as_str())],
            ),
            other => t(&format!("validation.{}", other.code())),
        }
    }

    /// 错误代码，例如 `distrito.required` / `items[0].cantidad.exceeds_stock`
    pub fn code(&self) -> String {
        match self.item_index {
            Some(idx) => format!("items[{}].{}.{}", idx, self.field, self.kind.code()),
            None => format!("{}.{}", self.field, self.kind.code()),
        }
    }
}

// ==========================================
// ValidationOutcome - 行校验结果
// ==========================================
// 不变量: 校验后 valid == issues.is_empty()
// 默认值为未校验（valid = false），行必须经过校验才能提交
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub valid: bool,
    pub issues: Vec<FieldIssue>,
}

impl Default for ValidationOutcome {
    /// 未校验
    fn default() -> Self {
        Self {
            valid: false,
            issues: Vec::new(),
        }
    }
}

impl ValidationOutcome {
    pub fn from_issues(issues: Vec<FieldIssue>) -> Self {
        Self {
            valid: issues.is_empty(),
            issues,
        }
    }

    /// 错误代码列表（保持校验顺序）
    pub fn errors(&self) -> Vec<String> {
        self.issues.iter().map(FieldIssue::code).collect()
    }

    pub fn has_issue(&self, field: FieldKey, kind_code: &str) -> bool {
        self.issues
            .iter()
            .any(|i| i.field == field && i.kind.code() == kind_code)
    }

    pub fn issues_for(&self, field: FieldKey) -> impl Iterator<Item = &FieldIssue> {
        self.issues.iter().filter(move |i| i.field == field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse() {
        assert_eq!(Role::parse(" Ecommerce "), Some(Role::Ecommerce));
        assert_eq!(Role::parse("MOTORIZADO"), Some(Role::Motorizado));
        assert_eq!(Role::parse("cliente"), None);
    }

    #[test]
    fn test_courier_selector_required_by_role() {
        assert!(Role::Admin.requires_courier_selector());
        assert!(Role::Ecommerce.requires_courier_selector());
        assert!(!Role::Courier.requires_courier_selector());
    }

    #[test]
    fn test_issue_codes() {
        let issue = FieldIssue::new(FieldKey::Distrito, IssueKind::Required);
        assert_eq!(issue.code(), "distrito.required");

        let issue = FieldIssue::on_item(FieldKey::Cantidad, 1, IssueKind::ExceedsStock { stock: 4.0 });
        assert_eq!(issue.code(), "items[1].cantidad.exceeds_stock");
    }

    #[test]
    fn test_outcome_valid_iff_no_issues() {
        assert!(ValidationOutcome::from_issues(Vec::new()).valid);

        let outcome =
            ValidationOutcome::from_issues(vec![FieldIssue::new(FieldKey::Sede, IssueKind::NotFound)]);
        assert!(!outcome.valid);
        assert!(outcome.has_issue(FieldKey::Sede, "not_found"));
        assert!(!outcome.has_issue(FieldKey::Sede, "required"));
    }

    #[test]
    fn test_default_outcome_is_unvalidated() {
        let outcome = ValidationOutcome::default();
        assert!(!outcome.valid);
        assert!(outcome.issues.is_empty());
    }
}
