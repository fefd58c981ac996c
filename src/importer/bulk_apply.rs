// ==========================================
// TIKTUY 批量导入 - 批量修改
// ==========================================
// 职责: 选择集管理 + 将同一修改应用到全部选中行
// 红线: 每个被修改的行立即重新校验
// 红线: 选择集为空时不做任何修改
// ==========================================

use crate::domain::preview::{OrderGroup, ProductRow};
use crate::domain::reference::ReferenceSets;
use crate::importer::resolver::{assign_product, resolve_order, resolve_product};
use crate::importer::row_validator::PreviewRow;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

// ==========================================
// SelectionState - 选中行下标（有序）
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    selected: BTreeSet<usize>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// 切换选中状态，返回切换后是否选中
    pub fn toggle(&mut self, index: usize) -> bool {
        if !self.selected.remove(&index) {
            self.selected.insert(index);
            true
        } else {
            false
        }
    }

    pub fn select(&mut self, index: usize) {
        self.selected.insert(index);
    }

    pub fn deselect(&mut self, index: usize) {
        self.selected.remove(&index);
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    pub fn contains(&self, index: usize) -> bool {
        self.selected.contains(&index)
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.selected.iter().copied()
    }

    pub fn indices(&self) -> Vec<usize> {
        self.iter().collect()
    }

    /// 全选（仅选中当前上下文中可操作的行），返回选中数量
    ///
    /// 例: 删除时全部行可选；对账重新校验时只选未结清的行
    pub fn select_all_eligible<T, F>(&mut self, rows: &[T], eligible: F) -> usize
    where
        F: Fn(&T) -> bool,
    {
        self.selected = rows
            .iter()
            .enumerate()
            .filter(|(_, row)| eligible(row))
            .map(|(idx, _)| idx)
            .collect();
        self.selected.len()
    }

    /// 删除下标集合对应的行，并重映射剩余选择
    ///
    /// 被删除的行移出选择集；后面的下标依次前移
    pub fn remove_rows<T>(&mut self, rows: &mut Vec<T>, removed: &BTreeSet<usize>) -> usize {
        let before = rows.len();
        let mut idx = 0;
        rows.retain(|_| {
            let keep = !removed.contains(&idx);
            idx += 1;
            keep
        });

        self.selected = self
            .selected
            .iter()
            .copied()
            .filter(|i| !removed.contains(i) && *i < before)
            .map(|i| i - removed.range(..i).count())
            .collect();

        before - rows.len()
    }

    /// 删除全部选中行
    pub fn remove_selected<T>(&mut self, rows: &mut Vec<T>) -> usize {
        let removed = self.selected.clone();
        self.remove_rows(rows, &removed)
    }
}

// ==========================================
// 订单批量修改
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderPatch {
    pub sede: Option<String>,
    pub distrito: Option<String>,
    pub direccion: Option<String>,
    pub fecha_entrega: Option<String>,
    pub producto: Option<String>, // 设置组内全部明细的商品
    pub cantidad: Option<f64>,    // 设置组内全部明细的数量
}

impl OrderPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// 将修改应用到订单组（不含校验）
pub(crate) fn patch_order(group: &mut OrderGroup, patch: &OrderPatch, refs: &ReferenceSets) {
    if let Some(sede) = &patch.sede {
        group.sede = sede.trim().to_string();
    }
    if let Some(distrito) = &patch.distrito {
        group.distrito = distrito.trim().to_string();
    }
    if let Some(direccion) = &patch.direccion {
        group.direccion = direccion.trim().to_string();
    }
    if let Some(fecha) = &patch.fecha_entrega {
        group.fecha_entrega = fecha.trim().to_string();
    }

    group.sede_id = refs.find_sede(&group.sede).map(|s| s.id);
    if let Some(producto) = &patch.producto {
        for item in group.items.iter_mut() {
            assign_product(item, group.sede_id, producto, refs);
        }
    }
    if let Some(cantidad) = patch.cantidad {
        for item in group.items.iter_mut() {
            item.cantidad = cantidad;
        }
    }

    // 站点变化后明细按新站点重新解析
    resolve_order(group, refs);
    if patch.producto.is_some() || patch.cantidad.is_some() {
        group.recompute_total();
    }
}

/// 批量修改订单组，返回受影响行数
pub fn apply_order_patch(
    rows: &mut [OrderGroup],
    selection: &SelectionState,
    patch: &OrderPatch,
    refs: &ReferenceSets,
) -> usize {
    apply_patch(rows, selection, |group| patch_order(group, patch, refs), refs)
}

// ==========================================
// 商品批量修改
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductPatch {
    pub categoria: Option<String>,
    pub almacen: Option<String>,
    pub precio: Option<f64>,
    pub stock: Option<f64>,
    pub stock_minimo: Option<f64>,
    pub peso: Option<f64>,
}

impl ProductPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

pub(crate) fn patch_product(row: &mut ProductRow, patch: &ProductPatch, refs: &ReferenceSets) {
    if let Some(categoria) = &patch.categoria {
        row.categoria = categoria.trim().to_string();
    }
    if let Some(almacen) = &patch.almacen {
        row.almacen = almacen.trim().to_string();
    }
    if let Some(precio) = patch.precio {
        row.precio = precio;
    }
    if let Some(stock) = patch.stock {
        row.stock = stock;
    }
    if let Some(stock_minimo) = patch.stock_minimo {
        row.stock_minimo = stock_minimo;
    }
    if let Some(peso) = patch.peso {
        row.peso = peso;
    }
    resolve_product(row, refs);
}

/// 批量修改商品行，返回受影响行数
pub fn apply_product_patch(
    rows: &mut [ProductRow],
    selection: &SelectionState,
    patch: &ProductPatch,
    refs: &ReferenceSets,
) -> usize {
    apply_patch(rows, selection, |row| patch_product(row, patch, refs), refs)
}

fn apply_patch<T, F>(
    rows: &mut [T],
    selection: &SelectionState,
    mut mutate: F,
    refs: &ReferenceSets,
) -> usize
where
    T: PreviewRow,
    F: FnMut(&mut T),
{
    let mut touched = 0;
    for idx in selection.iter() {
        if let Some(row) = rows.get_mut(idx) {
            mutate(row);
            row.revalidate(refs);
            touched += 1;
        }
    }
    debug!(selected = selection.len(), touched, "批量修改完成");
    touched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::preview::LineItem;
    use crate::domain::reference::{Producto, ReferenceTable, Sede, Zona};
    use crate::domain::types::{FieldKey, ValidationOutcome};

    fn refs() -> ReferenceSets {
        let mut refs = ReferenceSets::default();
        refs.sedes = ReferenceTable::from_entries(vec![
            Sede { id: 1, nombre: "Lima".to_string(), courier_id: None, ciudad: None },
            Sede { id: 2, nombre: "Cusco".to_string(), courier_id: None, ciudad: None },
        ]);
        for (sede_id, producto_id, precio) in [(1, 10, 20.0), (2, 20, 30.0)] {
            refs.productos_por_sede.insert(
                sede_id,
                ReferenceTable::from_entries(vec![Producto {
                    id: producto_id,
                    nombre: "Casaca".to_string(),
                    precio,
                    stock: Some(50.0),
                    sede_id: Some(sede_id),
                }]),
            );
            refs.zonas_por_sede.insert(
                sede_id,
                ReferenceTable::from_entries(vec![Zona {
                    id: sede_id * 100,
                    distrito: "Centro".to_string(),
                    tarifa: 5.0,
                    sede_id: Some(sede_id),
                }]),
            );
        }
        refs
    }

    fn group(sede: &str) -> OrderGroup {
        let mut g = OrderGroup::new("Ana");
        g.sede = sede.to_string();
        g.distrito = "Centro".to_string();
        g.direccion = "Jr. Uno 1".to_string();
        g.items.push(LineItem::new("Gorro", 1.0, 5.0));
        g
    }

    #[test]
    fn test_empty_selection_is_noop() {
        let mut rows = vec![group("Lima"), group("Cusco")];
        let snapshot = rows.clone();
        let patch = OrderPatch {
            distrito: Some(String::new()),
            ..Default::default()
        };
        let touched = apply_order_patch(&mut rows, &SelectionState::new(), &patch, &refs());
        assert_eq!(touched, 0);
        assert_eq!(rows, snapshot);
    }

    #[test]
    fn test_product_patch_resolves_per_site() {
        let refs = refs();
        let mut rows = vec![group("Lima"), group("Cusco")];
        let mut selection = SelectionState::new();
        selection.select_all_eligible(&rows, |_| true);

        let patch = OrderPatch {
            producto: Some("casaca".to_string()),
            ..Default::default()
        };
        assert_eq!(apply_order_patch(&mut rows, &selection, &patch, &refs), 2);

        assert_eq!(rows[0].items[0].producto_id, Some(10));
        assert_eq!(rows[0].monto_total, 20.0);
        assert_eq!(rows[1].items[0].producto_id, Some(20));
        assert_eq!(rows[1].monto_total, 30.0);
        assert!(rows.iter().all(|r| r.is_valid()));
    }

    #[test]
    fn test_patch_revalidates_touched_rows_only() {
        let refs = refs();
        let mut rows = vec![group("Lima"), group("Lima")];
        let mut selection = SelectionState::new();
        selection.select(1);

        let patch = OrderPatch {
            distrito: Some("  ".to_string()),
            ..Default::default()
        };
        apply_order_patch(&mut rows, &selection, &patch, &refs);

        // 未选中的行保持未校验状态
        assert_eq!(rows[0].validation, ValidationOutcome::default());
        assert!(rows[1].validation.has_issue(FieldKey::Distrito, "required"));
    }

    #[test]
    fn test_product_patch_on_products() {
        let mut rows = vec![ProductRow::new("Polo"), ProductRow::new("Gorra")];
        let mut selection = SelectionState::new();
        selection.select(0);
        let patch = ProductPatch {
            stock: Some(1.5),
            ..Default::default()
        };
        assert_eq!(apply_product_patch(&mut rows, &selection, &patch, &refs()), 1);
        assert!(rows[0].validation.has_issue(FieldKey::Stock, "not_integer"));
        assert_eq!(rows[1].stock, 0.0);
    }

    #[test]
    fn test_select_all_eligible_uses_predicate() {
        let rows = vec![1, 5, 2, 8];
        let mut selection = SelectionState::new();
        selection.select(0);
        let n = selection.select_all_eligible(&rows, |v| *v > 2);
        assert_eq!(n, 2);
        assert_eq!(selection.indices(), vec![1, 3]);
    }

    #[test]
    fn test_remove_rows_remaps_selection() {
        let mut rows = vec!["a", "b", "c", "d", "e"];
        let mut selection = SelectionState::new();
        selection.select(1);
        selection.select(4);

        let removed: BTreeSet<usize> = [0, 2].into_iter().collect();
        assert_eq!(selection.remove_rows(&mut rows, &removed), 2);
        assert_eq!(rows, vec!["b", "d", "e"]);
        assert_eq!(selection.indices(), vec![0, 2]);

        assert_eq!(selection.remove_selected(&mut rows), 2);
        assert_eq!(rows, vec!["d"]);
        assert!(selection.is_empty());
    }

    #[test]
    fn test_toggle() {
        let mut selection = SelectionState::new();
        assert!(selection.toggle(3));
        assert!(!selection.toggle(3));
        assert!(selection.is_empty());
    }
}
