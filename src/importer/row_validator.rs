// ==========================================
// TIKTUY 批量导入 - 行校验器实现
// ==========================================
// 职责: 必填 / 数值范围 / 参照匹配 → {valid, errors}
// 红线: 纯函数，不修改行；调用方负责把结果写回行
// 红线: 同一输入多次校验结果（含顺序）完全一致
// ==========================================
//
// 订单与商品的库存规则不同：
// - 订单导入消耗库存 → 数量不得超过已知库存
// - 商品导入创建库存 → 不与现有库存比较

use crate::domain::preview::{LineItem, OrderGroup, ProductRow};
use crate::domain::reference::ReferenceSets;
use crate::domain::types::{FieldIssue, FieldKey, IssueKind, ValidationOutcome};
use crate::importer::data_cleaner::DataCleaner;
use crate::importer::resolver::{resolve_order, resolve_product};

pub struct RowValidator;

impl RowValidator {
    /// 校验订单预览组
    pub fn validate_order(&self, group: &OrderGroup, refs: &ReferenceSets) -> ValidationOutcome {
        let mut issues = Vec::new();

        require_text(&mut issues, FieldKey::Cliente, &group.cliente);

        // 站点: 为空与未找到分开报告
        let sede = refs.find_sede(&group.sede);
        if is_blank(&group.sede) {
            issues.push(FieldIssue::new(FieldKey::Sede, IssueKind::Required));
        } else if sede.is_none() {
            issues.push(FieldIssue::new(FieldKey::Sede, IssueKind::NotFound));
        }
        let sede_id = sede.map(|s| s.id);

        // 区县: 按站点的配送区域匹配
        if is_blank(&group.distrito) {
            issues.push(FieldIssue::new(FieldKey::Distrito, IssueKind::Required));
        } else if refs.find_zona(sede_id, &group.distrito).is_none() {
            issues.push(FieldIssue::new(FieldKey::Distrito, IssueKind::NotFound));
        }

        require_text(&mut issues, FieldKey::Direccion, &group.direccion);

        if !is_blank(&group.fecha_entrega) && DataCleaner.parse_date(&group.fecha_entrega).is_none()
        {
            issues.push(FieldIssue::new(FieldKey::FechaEntrega, IssueKind::InvalidDate));
        }

        if group.items.is_empty() {
            issues.push(FieldIssue::new(FieldKey::Items, IssueKind::Required));
        }
        for (idx, item) in group.items.iter().enumerate() {
            self.validate_line_item(&mut issues, idx, item, sede_id, refs);
        }

        if let Some(kind) = money_issue(group.monto_total) {
            issues.push(FieldIssue::new(FieldKey::MontoTotal, kind));
        }

        ValidationOutcome::from_issues(issues)
    }

    fn validate_line_item(
        &self,
        issues: &mut Vec<FieldIssue>,
        idx: usize,
        item: &LineItem,
        sede_id: Option<i64>,
        refs: &ReferenceSets,
    ) {
        let producto = refs.find_producto(sede_id, &item.producto);
        if is_blank(&item.producto) {
            issues.push(FieldIssue::on_item(FieldKey::Producto, idx, IssueKind::Required));
        } else if producto.is_none() {
            issues.push(FieldIssue::on_item(FieldKey::Producto, idx, IssueKind::NotFound));
        }

        // 库存只看本站点的记录
        let stock = sede_id
            .and_then(|id| refs.find_producto_in_sede(id, &item.producto))
            .and_then(|p| p.stock);
        if let Some(kind) = quantity_issue(item.cantidad, stock) {
            issues.push(FieldIssue::on_item(FieldKey::Cantidad, idx, kind));
        }

        if let Some(kind) = money_issue(item.precio_unitario) {
            issues.push(FieldIssue::on_item(FieldKey::PrecioUnitario, idx, kind));
        }
    }

    /// 校验商品预览行
    pub fn validate_product(&self, row: &ProductRow, refs: &ReferenceSets) -> ValidationOutcome {
        let mut issues = Vec::new();

        require_text(&mut issues, FieldKey::Nombre, &row.nombre);

        // 分类可为空，填写了就必须存在
        if !is_blank(&row.categoria) && refs.find_categoria(&row.categoria).is_none() {
            issues.push(FieldIssue::new(FieldKey::Categoria, IssueKind::NotFound));
        }

        if is_blank(&row.almacen) {
            issues.push(FieldIssue::new(FieldKey::Almacen, IssueKind::Required));
        } else if refs.find_almacen(&row.almacen).is_none() {
            issues.push(FieldIssue::new(FieldKey::Almacen, IssueKind::NotFound));
        }

        if let Some(kind) = money_issue(row.precio) {
            issues.push(FieldIssue::new(FieldKey::Precio, kind));
        }
        if let Some(kind) = whole_number_issue(row.stock) {
            issues.push(FieldIssue::new(FieldKey::Stock, kind));
        }
        if let Some(kind) = whole_number_issue(row.stock_minimo) {
            issues.push(FieldIssue::new(FieldKey::StockMinimo, kind));
        }
        if let Some(kind) = money_issue(row.peso) {
            issues.push(FieldIssue::new(FieldKey::Peso, kind));
        }

        ValidationOutcome::from_issues(issues)
    }
}

// ==========================================
// 规则函数
// ==========================================

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn require_text(issues: &mut Vec<FieldIssue>, field: FieldKey, value: &str) {
    if is_blank(value) {
        issues.push(FieldIssue::new(field, IssueKind::Required));
    }
}

/// 非负有限数（金额、重量）
fn money_issue(value: f64) -> Option<IssueKind> {
    if !value.is_finite() {
        Some(IssueKind::NotFinite)
    } else if value < 0.0 {
        Some(IssueKind::Negative)
    } else {
        None
    }
}

/// 非负整数（商品库存）
fn whole_number_issue(value: f64) -> Option<IssueKind> {
    money_issue(value).or_else(|| (value.fract() != 0.0).then_some(IssueKind::NotInteger))
}

/// 订单数量: 正整数且不超过已知库存
pub fn quantity_issue(cantidad: f64, stock: Option<f64>) -> Option<IssueKind> {
    if let Some(kind) = whole_number_issue(cantidad) {
        return Some(kind);
    }
    if cantidad == 0.0 {
        return Some(IssueKind::Zero);
    }
    match stock {
        Some(stock) if stock.is_finite() && cantidad > stock => {
            Some(IssueKind::ExceedsStock { stock })
        }
        _ => None,
    }
}

// ==========================================
// PreviewRow - 可校验的预览行
// ==========================================
pub trait PreviewRow {
    fn validate(&self, refs: &ReferenceSets) -> ValidationOutcome;

    fn validation(&self) -> &ValidationOutcome;

    fn store_validation(&mut self, outcome: ValidationOutcome);

    /// 按参照数据补全 ID / 库存 / 价格
    fn resolve(&mut self, refs: &ReferenceSets);

    /// 重新校验并写回
    fn revalidate(&mut self, refs: &ReferenceSets) {
        let outcome = self.validate(refs);
        self.store_validation(outcome);
    }
}

impl PreviewRow for OrderGroup {
    fn validate(&self, refs: &ReferenceSets) -> ValidationOutcome {
        RowValidator.validate_order(self, refs)
    }

    fn validation(&self) -> &ValidationOutcome {
        &self.validation
    }

    fn store_validation(&mut self, outcome: ValidationOutcome) {
        self.validation = outcome;
    }

    fn resolve(&mut self, refs: &ReferenceSets) {
        resolve_order(self, refs);
    }
}

impl PreviewRow for ProductRow {
    fn validate(&self, refs: &ReferenceSets) -> ValidationOutcome {
        RowValidator.validate_product(self, refs)
    }

    fn validation(&self) -> &ValidationOutcome {
        &self.validation
    }

    fn store_validation(&mut self, outcome: ValidationOutcome) {
        self.validation = outcome;
    }

    fn resolve(&mut self, refs: &ReferenceSets) {
        resolve_product(self, refs);
    }
}
