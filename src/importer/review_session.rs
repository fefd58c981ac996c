// ==========================================
// TIKTUY 批量导入 - 预览审核会话
// ==========================================
// 状态机: Idle → Loading → Preview → Submitting → (Closed | Preview + 错误横幅)
// 红线: 行只通过 &mut ReviewSession 修改，每次修改后立即重新校验
// 红线: 关闭后到达的加载结果（过期票据）直接丢弃
// ==========================================

use crate::domain::preview::{OrderGroup, ProductRow};
use crate::domain::reference::ReferenceSets;
use crate::importer::bulk_apply::{
    apply_order_patch, apply_product_patch, patch_order, patch_product, OrderPatch, ProductPatch,
    SelectionState,
};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::resolver::{assign_product, resolve_order};
use crate::importer::row_validator::PreviewRow;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

// ==========================================
// ReviewState - 会话状态
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewState {
    Idle,
    Loading,
    Preview,
    Submitting,
    Closed,
}

impl fmt::Display for ReviewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReviewState::Idle => "idle",
            ReviewState::Loading => "loading",
            ReviewState::Preview => "preview",
            ReviewState::Submitting => "submitting",
            ReviewState::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// 加载票据（会话代数）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket(u64);

impl LoadTicket {
    pub fn generation(&self) -> u64 {
        self.0
    }
}

/// 行统计
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RowSummary {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
    pub selected: usize,
}

// ==========================================
// ReviewSession - 预览审核会话
// ==========================================
#[derive(Debug)]
pub struct ReviewSession<T> {
    state: ReviewState,
    generation: u64,
    rows: Vec<T>,
    refs: ReferenceSets,
    selection: SelectionState,
    banner: Option<String>,     // 提交失败横幅（会话保持打开）
    load_error: Option<String>, // 上传失败（预览不打开）
}

impl<T> Default for ReviewSession<T> {
    fn default() -> Self {
        Self {
            state: ReviewState::Idle,
            generation: 0,
            rows: Vec::new(),
            refs: ReferenceSets::default(),
            selection: SelectionState::default(),
            banner: None,
            load_error: None,
        }
    }
}

pub type OrderReviewSession = ReviewSession<OrderGroup>;
pub type ProductReviewSession = ReviewSession<ProductRow>;

impl<T: PreviewRow> ReviewSession<T> {
    pub fn new() -> Self {
        Self::default()
    }

    // ===== 只读访问 =====

    pub fn state(&self) -> ReviewState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    pub fn refs(&self) -> &ReferenceSets {
        &self.refs
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    pub fn summary(&self) -> RowSummary {
        let valid = self.rows.iter().filter(|r| r.validation().valid).count();
        RowSummary {
            total: self.rows.len(),
            valid,
            invalid: self.rows.len() - valid,
            selected: self.selection.len(),
        }
    }

    pub fn invalid_indices(&self) -> Vec<usize> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, r)| !r.validation().valid)
            .map(|(i, _)| i)
            .collect()
    }

    // ===== 状态转换 =====

    fn transition_error(&self, to: ReviewState) -> ImportError {
        ImportError::InvalidStateTransition {
            from: self.state.to_string(),
            to: to.to_string(),
        }
    }

    fn ensure_preview(&self) -> ImportResult<()> {
        if self.state == ReviewState::Preview {
            Ok(())
        } else {
            Err(self.transition_error(ReviewState::Preview))
        }
    }

    fn discard(&mut self) {
        self.rows.clear();
        self.selection.clear();
        self.refs = ReferenceSets::default();
        self.banner = None;
    }

    /// Idle/Closed → Loading，返回本次加载的票据
    pub fn begin_loading(&mut self) -> ImportResult<LoadTicket> {
        match self.state {
            ReviewState::Idle | ReviewState::Closed => {
                self.discard();
                self.load_error = None;
                self.generation += 1;
                self.state = ReviewState::Loading;
                debug!(generation = self.generation, "开始加载预览");
                Ok(LoadTicket(self.generation))
            }
            _ => Err(self.transition_error(ReviewState::Loading)),
        }
    }

    fn is_current(&self, ticket: LoadTicket) -> bool {
        self.state == ReviewState::Loading && ticket.0 == self.generation
    }

    /// Loading → Preview
    ///
    /// # 返回
    /// - true: 结果已采用（行已解析并校验）
    /// - false: 票据过期（会话已关闭或重新加载），结果被丢弃
    pub fn finish_loading(&mut self, ticket: LoadTicket, rows: Vec<T>, refs: ReferenceSets) -> bool {
        if !self.is_current(ticket) {
            warn!(
                ticket = ticket.0,
                generation = self.generation,
                "丢弃过期的预览结果"
            );
            return false;
        }

        self.rows = rows;
        self.refs = refs;
        for row in self.rows.iter_mut() {
            row.resolve(&self.refs);
            row.revalidate(&self.refs);
        }
        self.state = ReviewState::Preview;

        let summary = self.summary();
        info!(
            total = summary.total,
            valid = summary.valid,
            invalid = summary.invalid,
            "预览已打开"
        );
        true
    }

    /// Loading → Idle（上传失败: 阻断性提示，预览不打开）
    pub fn fail_loading(&mut self, ticket: LoadTicket, message: impl Into<String>) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        let message = message.into();
        warn!(error = %message, "预览加载失败");
        self.load_error = Some(message);
        self.state = ReviewState::Idle;
        true
    }

    /// Preview → Submitting
    pub fn begin_submit(&mut self) -> ImportResult<()> {
        if self.state != ReviewState::Preview {
            return Err(self.transition_error(ReviewState::Submitting));
        }
        self.banner = None;
        self.state = ReviewState::Submitting;
        Ok(())
    }

    /// Submitting → Closed（行被丢弃）
    pub fn submit_succeeded(&mut self) -> ImportResult<()> {
        if self.state != ReviewState::Submitting {
            return Err(self.transition_error(ReviewState::Closed));
        }
        self.close();
        Ok(())
    }

    /// Submitting → Preview + 横幅（会话保持打开，可修正后重试）
    pub fn submit_failed(&mut self, message: impl Into<String>) -> ImportResult<()> {
        if self.state != ReviewState::Submitting {
            return Err(self.transition_error(ReviewState::Preview));
        }
        self.banner = Some(message.into());
        self.state = ReviewState::Preview;
        Ok(())
    }

    /// 任意状态 → Closed
    pub fn close(&mut self) {
        self.discard();
        self.generation += 1;
        self.state = ReviewState::Closed;
        debug!(generation = self.generation, "预览会话关闭");
    }

    // ===== 选择 =====

    pub fn toggle(&mut self, index: usize) -> ImportResult<bool> {
        self.ensure_preview()?;
        self.check_row(index)?;
        Ok(self.selection.toggle(index))
    }

    pub fn select_all(&mut self) -> ImportResult<usize> {
        self.ensure_preview()?;
        Ok(self.selection.select_all_eligible(&self.rows, |_| true))
    }

    pub fn select_invalid(&mut self) -> ImportResult<usize> {
        self.ensure_preview()?;
        Ok(self
            .selection
            .select_all_eligible(&self.rows, |r| !r.validation().valid))
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// 删除选中行
    pub fn remove_selected(&mut self) -> ImportResult<usize> {
        self.ensure_preview()?;
        Ok(self.selection.remove_selected(&mut self.rows))
    }

    fn check_row(&self, index: usize) -> ImportResult<()> {
        if index < self.rows.len() {
            Ok(())
        } else {
            Err(ImportError::RowOutOfRange {
                index,
                len: self.rows.len(),
            })
        }
    }

    /// 修改单行并立即重新校验
    fn edit_row<F>(&mut self, index: usize, mutate: F) -> ImportResult<()>
    where
        F: FnOnce(&mut T, &ReferenceSets) -> ImportResult<()>,
    {
        self.ensure_preview()?;
        self.check_row(index)?;
        let row = &mut self.rows[index];
        mutate(row, &self.refs)?;
        row.revalidate(&self.refs);
        Ok(())
    }
}

// ==========================================
// 订单编辑
// ==========================================
impl ReviewSession<OrderGroup> {
    pub fn set_cliente(&mut self, index: usize, value: &str) -> ImportResult<()> {
        self.edit_row(index, |g, _| {
            g.cliente = value.trim().to_string();
            Ok(())
        })
    }

    pub fn set_telefono(&mut self, index: usize, value: &str) -> ImportResult<()> {
        self.edit_row(index, |g, _| {
            g.telefono = value.trim().to_string();
            Ok(())
        })
    }

    /// 修改站点: 明细商品按新站点重新解析
    pub fn set_sede(&mut self, index: usize, value: &str) -> ImportResult<()> {
        self.edit_row(index, |g, refs| {
            g.sede = value.trim().to_string();
            resolve_order(g, refs);
            Ok(())
        })
    }

    pub fn set_distrito(&mut self, index: usize, value: &str) -> ImportResult<()> {
        self.edit_row(index, |g, _| {
            g.distrito = value.trim().to_string();
            Ok(())
        })
    }

    pub fn set_direccion(&mut self, index: usize, value: &str) -> ImportResult<()> {
        self.edit_row(index, |g, _| {
            g.direccion = value.trim().to_string();
            Ok(())
        })
    }

    pub fn set_referencia(&mut self, index: usize, value: &str) -> ImportResult<()> {
        self.edit_row(index, |g, _| {
            g.referencia = value.trim().to_string();
            Ok(())
        })
    }

    pub fn set_fecha_entrega(&mut self, index: usize, value: &str) -> ImportResult<()> {
        self.edit_row(index, |g, _| {
            g.fecha_entrega = value.trim().to_string();
            Ok(())
        })
    }

    /// 修改明细数量（总额重算）
    pub fn set_cantidad(&mut self, index: usize, item: usize, cantidad: f64) -> ImportResult<()> {
        self.edit_row(index, |g, _| {
            let line = g
                .items
                .get_mut(item)
                .ok_or(ImportError::ItemOutOfRange { row: index, item })?;
            line.cantidad = cantidad;
            g.recompute_total();
            Ok(())
        })
    }

    /// 修改明细单价（总额重算）
    pub fn set_precio_unitario(&mut self, index: usize, item: usize, precio: f64) -> ImportResult<()> {
        self.edit_row(index, |g, _| {
            let line = g
                .items
                .get_mut(item)
                .ok_or(ImportError::ItemOutOfRange { row: index, item })?;
            line.precio_unitario = precio;
            g.recompute_total();
            Ok(())
        })
    }

    /// 更换明细商品（按本行站点解析，采用目录价格，总额重算）
    pub fn set_producto(&mut self, index: usize, item: usize, name: &str) -> ImportResult<()> {
        self.edit_row(index, |g, refs| {
            let sede_id = refs.find_sede(&g.sede).map(|s| s.id);
            let line = g
                .items
                .get_mut(item)
                .ok_or(ImportError::ItemOutOfRange { row: index, item })?;
            assign_product(line, sede_id, name, refs);
            g.sede_id = sede_id;
            g.recompute_total();
            Ok(())
        })
    }

    /// 人工修改总额
    pub fn set_total(&mut self, index: usize, total: f64) -> ImportResult<()> {
        self.edit_row(index, |g, _| {
            g.set_manual_total(total);
            Ok(())
        })
    }

    pub fn remove_item(&mut self, index: usize, item: usize) -> ImportResult<()> {
        self.edit_row(index, |g, _| {
            if item >= g.items.len() {
                return Err(ImportError::ItemOutOfRange { row: index, item });
            }
            g.items.remove(item);
            g.recompute_total();
            Ok(())
        })
    }

    /// 单行套用批量修改结构
    pub fn edit_order(&mut self, index: usize, patch: &OrderPatch) -> ImportResult<()> {
        self.edit_row(index, |g, refs| {
            patch_order(g, patch, refs);
            Ok(())
        })
    }

    /// 批量修改选中行，返回受影响行数
    pub fn apply_to_selection(&mut self, patch: &OrderPatch) -> ImportResult<usize> {
        self.ensure_preview()?;
        Ok(apply_order_patch(
            &mut self.rows,
            &self.selection,
            patch,
            &self.refs,
        ))
    }
}

// ==========================================
// 商品编辑
// ==========================================
impl ReviewSession<ProductRow> {
    pub fn set_nombre(&mut self, index: usize, value: &str) -> ImportResult<()> {
        self.edit_row(index, |row, _| {
            row.nombre = value.trim().to_string();
            Ok(())
        })
    }

    pub fn set_descripcion(&mut self, index: usize, value: &str) -> ImportResult<()> {
        self.edit_row(index, |row, _| {
            row.descripcion = value.trim().to_string();
            Ok(())
        })
    }

    pub fn edit_product(&mut self, index: usize, patch: &ProductPatch) -> ImportResult<()> {
        self.edit_row(index, |row, refs| {
            patch_product(row, patch, refs);
            Ok(())
        })
    }

    pub fn apply_to_selection(&mut self, patch: &ProductPatch) -> ImportResult<usize> {
        self.ensure_preview()?;
        Ok(apply_product_patch(
            &mut self.rows,
            &self.selection,
            patch,
            &self.refs,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::preview::LineItem;
    use crate::domain::reference::{Producto, ReferenceTable, Sede, Zona};
    use crate::domain::types::FieldKey;

    fn refs() -> ReferenceSets {
        let mut refs = ReferenceSets::default();
        refs.sedes = ReferenceTable::from_entries(vec![Sede {
            id: 1,
            nombre: "Lima".to_string(),
            courier_id: None,
            ciudad: None,
        }]);
        refs.productos_por_sede.insert(
            1,
            ReferenceTable::from_entries(vec![Producto {
                id: 10,
                nombre: "Polo".to_string(),
                precio: 10.5,
                stock: Some(4.0),
                sede_id: Some(1),
            }]),
        );
        refs.zonas_por_sede.insert(
            1,
            ReferenceTable::from_entries(vec![Zona {
                id: 2,
                distrito: "Surco".to_string(),
                tarifa: 7.0,
                sede_id: Some(1),
            }]),
        );
        refs
    }

    fn group() -> OrderGroup {
        let mut g = OrderGroup::new("Ana");
        g.sede = "Lima".to_string();
        g.distrito = "Surco".to_string();
        g.direccion = "Calle 1".to_string();
        g.items.push(LineItem::new("Polo", 2.0, 10.5));
        g
    }

    fn open_session() -> OrderReviewSession {
        let mut session = OrderReviewSession::new();
        let ticket = session.begin_loading().unwrap();
        assert!(session.finish_loading(ticket, vec![group(), group()], refs()));
        session
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut session = open_session();
        assert_eq!(session.state(), ReviewState::Preview);
        assert_eq!(session.summary().valid, 2);

        session.begin_submit().unwrap();
        assert_eq!(session.state(), ReviewState::Submitting);
        session.submit_succeeded().unwrap();
        assert_eq!(session.state(), ReviewState::Closed);
        assert!(session.rows().is_empty());
    }

    #[test]
    fn test_submit_failure_keeps_rows_and_shows_banner() {
        let mut session = open_session();
        session.begin_submit().unwrap();
        session.submit_failed("Stock insuficiente").unwrap();

        assert_eq!(session.state(), ReviewState::Preview);
        assert_eq!(session.banner(), Some("Stock insuficiente"));
        assert_eq!(session.rows().len(), 2);
    }

    #[test]
    fn test_stale_ticket_discarded_after_close() {
        let mut session = OrderReviewSession::new();
        let ticket = session.begin_loading().unwrap();
        session.close();

        assert!(!session.finish_loading(ticket, vec![group()], refs()));
        assert_eq!(session.state(), ReviewState::Closed);
        assert!(session.rows().is_empty());
    }

    #[test]
    fn test_stale_ticket_discarded_after_reload() {
        let mut session = OrderReviewSession::new();
        let first = session.begin_loading().unwrap();
        session.close();
        let second = session.begin_loading().unwrap();

        assert!(!session.finish_loading(first, vec![group()], refs()));
        assert!(session.finish_loading(second, vec![group(), group()], refs()));
        assert_eq!(session.rows().len(), 2);
    }

    #[test]
    fn test_fail_loading_returns_to_idle() {
        let mut session = OrderReviewSession::new();
        let ticket = session.begin_loading().unwrap();
        assert!(session.fail_loading(ticket, "Formato inválido"));
        assert_eq!(session.state(), ReviewState::Idle);
        assert_eq!(session.load_error(), Some("Formato inválido"));
    }

    #[test]
    fn test_invalid_transitions() {
        let mut session = OrderReviewSession::new();
        assert!(matches!(
            session.begin_submit(),
            Err(ImportError::InvalidStateTransition { .. })
        ));
        assert!(session.submit_succeeded().is_err());
        assert!(session.set_cliente(0, "x").is_err());

        let _ticket = session.begin_loading().unwrap();
        assert!(session.begin_loading().is_err());
    }

    #[test]
    fn test_set_cantidad_recomputes_total() {
        let mut session = open_session();
        session.set_cantidad(0, 0, 3.0).unwrap();
        assert_eq!(session.rows()[0].monto_total, 31.5);
        assert!(session.rows()[0].is_valid());
    }

    #[test]
    fn test_edit_revalidates_immediately() {
        let mut session = open_session();
        session.set_distrito(1, "").unwrap();
        assert!(session.rows()[1]
            .validation
            .has_issue(FieldKey::Distrito, "required"));

        session.set_cantidad(0, 0, 5.0).unwrap();
        assert!(session.rows()[0]
            .validation
            .has_issue(FieldKey::Cantidad, "exceeds_stock"));
        assert_eq!(session.invalid_indices(), vec![0, 1]);
    }

    #[test]
    fn test_set_producto_adopts_catalog_price() {
        let mut session = open_session();
        session.set_precio_unitario(0, 0, 1.0).unwrap();
        assert_eq!(session.rows()[0].monto_total, 2.0);

        session.set_producto(0, 0, "polo").unwrap();
        assert_eq!(session.rows()[0].items[0].precio_unitario, 10.5);
        assert_eq!(session.rows()[0].monto_total, 21.0);
    }

    #[test]
    fn test_item_out_of_range() {
        let mut session = open_session();
        assert!(matches!(
            session.set_cantidad(0, 9, 1.0),
            Err(ImportError::ItemOutOfRange { row: 0, item: 9 })
        ));
        assert!(matches!(
            session.set_cliente(7, "x"),
            Err(ImportError::RowOutOfRange { index: 7, len: 2 })
        ));
    }

    #[test]
    fn test_remove_selected_rows() {
        let mut session = open_session();
        session.toggle(0).unwrap();
        assert_eq!(session.remove_selected().unwrap(), 1);
        assert_eq!(session.rows().len(), 1);
        assert!(session.selection().is_empty());
    }
}
