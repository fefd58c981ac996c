// ==========================================
// TIKTUY 批量导入 - 字段映射器实现
// ==========================================
// 职责: 表格列 → 预览行字段映射 + 类型转换
// 列名: 按归一化比较（忽略大小写/重音），支持别名
// ==========================================

use crate::domain::preview::{round_money, LineItem, OrderGroup, ProductRow};
use crate::importer::error::ImportResult;
use crate::importer::file_parser::RawRow;
use crate::importer::import_traits::FieldMapper;
use crate::importer::normalize::normalize_key;
use std::collections::HashMap;
use tracing::{debug, warn};

// ==========================================
// 列名别名
// ==========================================
mod columns {
    pub const CLIENTE: &[&str] = &["cliente", "nombre cliente", "nombre del cliente", "destinatario"];
    pub const TELEFONO: &[&str] = &["telefono", "celular", "telefono cliente"];
    pub const SEDE: &[&str] = &["sede", "courier", "sede courier"];
    pub const DISTRITO: &[&str] = &["distrito"];
    pub const DIRECCION: &[&str] = &["direccion", "direccion de entrega"];
    pub const REFERENCIA: &[&str] = &["referencia"];
    pub const FECHA: &[&str] = &["fecha entrega", "fecha de entrega", "fecha"];
    pub const PRODUCTO: &[&str] = &["producto", "nombre producto"];
    pub const CANTIDAD: &[&str] = &["cantidad", "unidades"];
    pub const PRECIO_UNITARIO: &[&str] = &["precio unitario", "precio"];
    pub const MONTO: &[&str] = &["monto total", "monto", "total"];

    pub const NOMBRE: &[&str] = &["nombre", "nombre producto", "producto"];
    pub const DESCRIPCION: &[&str] = &["descripcion"];
    pub const CATEGORIA: &[&str] = &["categoria"];
    pub const ALMACEN: &[&str] = &["almacen", "sede"];
    pub const PRECIO: &[&str] = &["precio", "precio unitario"];
    pub const STOCK: &[&str] = &["stock", "cantidad"];
    pub const STOCK_MINIMO: &[&str] = &["stock minimo"];
    pub const PESO: &[&str] = &["peso", "peso kg"];
}

/// 行视图：归一化列名 → 值
struct RowView {
    row_number: usize,
    cells: HashMap<String, String>,
}

impl RowView {
    fn new(row: RawRow) -> Self {
        let cells = row
            .cells
            .into_iter()
            .map(|(k, v)| (normalize_key(&k), v.trim().to_string()))
            .collect();
        Self {
            row_number: row.row_number,
            cells,
        }
    }

    /// 取第一个非空别名列
    fn text(&self, aliases: &[&str]) -> String {
        aliases
            .iter()
            .filter_map(|a| self.cells.get(*a))
            .find(|v| !v.is_empty())
            .cloned()
            .unwrap_or_default()
    }

    fn has_any(&self, aliases: &[&str]) -> bool {
        !self.text(aliases).is_empty()
    }

    /// 解析数值
    ///
    /// # 规则
    /// - 空值 → 0.0
    /// - 去除货币前缀 "S/"，分隔符规则见 `parse_number`
    /// - 无法解析 → NaN（由行校验器报告 not_finite，而不是中断映射）
    fn number(&self, aliases: &[&str], field: &str) -> f64 {
        let raw = self.text(aliases);
        if raw.is_empty() {
            return 0.0;
        }
        match parse_number(&raw) {
            Some(v) => v,
            None => {
                warn!(row = self.row_number, field, value = %raw, "数值无法解析");
                f64::NAN
            }
        }
    }
}

/// 宽松数值解析
///
/// # 分隔符规则
/// - 逗号和点同时出现: 最后出现的为小数点，另一个为千分位
/// - 只有逗号: 后跟恰好 3 位数字（且整数部分非 0）为千分位，否则为小数点
/// - 只有一个点: 小数点
/// - 多个相同分隔符: 千分位
/// - 分组不规整（如 "1,23,4"）→ None
pub fn parse_number(raw: &str) -> Option<f64> {
    let mut s = raw.trim();
    for prefix in ["S/.", "S/", "s/.", "s/", "$"] {
        if let Some(rest) = s.strip_prefix(prefix) {
            s = rest.trim();
            break;
        }
    }
    let (sign, body) = match s.strip_prefix('-') {
        Some(rest) => ("-", rest.trim()),
        None => ("", s),
    };

    let normalized = match (body.rfind(','), body.rfind('.')) {
        (Some(comma), Some(dot)) => {
            let (group, decimal) = if comma > dot { ('.', ',') } else { (',', '.') };
            let (int_part, frac) = body.rsplit_once(decimal)?;
            format!("{}.{}", ungroup(int_part, group)?, frac)
        }
        (Some(_), None) => comma_only(body)?,
        (None, Some(_)) if body.matches('.').count() > 1 => ungroup(body, '.')?,
        _ => body.to_string(),
    };
    format!("{}{}", sign, normalized).parse::<f64>().ok()
}

fn comma_only(body: &str) -> Option<String> {
    if body.matches(',').count() > 1 {
        return ungroup(body, ',');
    }
    let (int_part, frac) = body.split_once(',')?;
    if frac.len() == 3 && !int_part.is_empty() && int_part != "0" {
        ungroup(body, ',')
    } else {
        Some(format!("{}.{}", int_part, frac))
    }
}

/// 去掉千分位: 首段 1-3 位数字，其余各段恰好 3 位
fn ungroup(value: &str, sep: char) -> Option<String> {
    let is_digits = |g: &str| !g.is_empty() && g.bytes().all(|b| b.is_ascii_digit());
    let mut groups = value.split(sep);
    let first = groups.next()?;
    if !is_digits(first) || first.len() > 3 {
        return None;
    }
    let mut out = first.to_string();
    for group in groups {
        if group.len() != 3 || !is_digits(group) {
            return None;
        }
        out.push_str(group);
    }
    Some(out)
}

pub struct SpreadsheetFieldMapper;

impl SpreadsheetFieldMapper {
    fn map_line_item(view: &RowView) -> Option<LineItem> {
        let producto = view.text(columns::PRODUCTO);
        let has_numbers = view.has_any(columns::CANTIDAD) || view.has_any(columns::PRECIO_UNITARIO);
        if producto.is_empty() && !has_numbers {
            return None;
        }
        Some(LineItem::new(
            &producto,
            view.number(columns::CANTIDAD, "cantidad"),
            view.number(columns::PRECIO_UNITARIO, "precio_unitario"),
        ))
    }

    /// 是否为续行（只有明细列，没有客户/地址信息）
    fn is_continuation(view: &RowView) -> bool {
        !view.has_any(columns::CLIENTE)
            && !view.has_any(columns::DIRECCION)
            && !view.has_any(columns::DISTRITO)
            && view.has_any(columns::PRODUCTO)
    }

    fn finish_group(group: &mut OrderGroup, declared_total: Option<f64>) {
        let computed = group.computed_total();
        match declared_total {
            Some(total) if !total.is_finite() || round_money(total) != computed => {
                group.set_manual_total(total)
            }
            _ => group.recompute_total(),
        }
    }
}

impl FieldMapper for SpreadsheetFieldMapper {
    fn map_orders(&self, rows: Vec<RawRow>) -> ImportResult<Vec<OrderGroup>> {
        let mut groups: Vec<OrderGroup> = Vec::new();
        let mut declared: Vec<Option<f64>> = Vec::new();

        for row in rows {
            let view = RowView::new(row);

            if Self::is_continuation(&view) && !groups.is_empty() {
                if let (Some(group), Some(item)) = (groups.last_mut(), Self::map_line_item(&view)) {
                    debug!(row = view.row_number, "续行合并到上一订单");
                    group.items.push(item);
                }
                continue;
            }

            let mut group = OrderGroup::new(&view.text(columns::CLIENTE));
            group.telefono = view.text(columns::TELEFONO);
            group.sede = view.text(columns::SEDE);
            group.distrito = view.text(columns::DISTRITO);
            group.direccion = view.text(columns::DIRECCION);
            group.referencia = view.text(columns::REFERENCIA);
            group.fecha_entrega = view.text(columns::FECHA);
            if let Some(item) = Self::map_line_item(&view) {
                group.items.push(item);
            }

            declared.push(if view.has_any(columns::MONTO) {
                Some(view.number(columns::MONTO, "monto_total"))
            } else {
                None
            });
            groups.push(group);
        }

        for (group, total) in groups.iter_mut().zip(declared) {
            Self::finish_group(group, total);
        }

        Ok(groups)
    }

    fn map_products(&self, rows: Vec<RawRow>) -> ImportResult<Vec<ProductRow>> {
        Ok(rows
            .into_iter()
            .map(RowView::new)
            .map(|view| {
                let mut row = ProductRow::new(&view.text(columns::NOMBRE));
                row.descripcion = view.text(columns::DESCRIPCION);
                row.categoria = view.text(columns::CATEGORIA);
                row.almacen = view.text(columns::ALMACEN);
                row.precio = view.number(columns::PRECIO, "precio");
                row.stock = view.number(columns::STOCK, "stock");
                row.stock_minimo = view.number(columns::STOCK_MINIMO, "stock_minimo");
                row.peso = view.number(columns::PESO, "peso");
                row
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order_row(n: usize) -> RawRow {
        RawRow::new(n)
            .with("Cliente", "Ana Torres")
            .with("Teléfono", "987654321")
            .with("Sede", "Sede Lima")
            .with("Distrito", "Miraflores")
            .with("Dirección", "Av. Larco 123")
            .with("Fecha entrega", "15/03/2026")
            .with("Producto", "Polo")
            .with("Cantidad", "2")
            .with("Precio unitario", "S/ 10,50")
    }

    #[test]
    fn test_parse_number_variants() {
        assert_eq!(parse_number("10.5"), Some(10.5));
        assert_eq!(parse_number("10,50"), Some(10.5));
        assert_eq!(parse_number("S/ 1,234.50"), Some(1234.5));
        assert_eq!(parse_number("abc"), None);
    }

    #[test]
    fn test_parse_number_separators() {
        assert_eq!(parse_number("1.234,50"), Some(1234.5));
        assert_eq!(parse_number("S/ 1.234,50"), Some(1234.5));
        assert_eq!(parse_number("1,234"), Some(1234.0));
        assert_eq!(parse_number("1,234,567"), Some(1234567.0));
        assert_eq!(parse_number("1.234.567"), Some(1234567.0));
        assert_eq!(parse_number("0,500"), Some(0.5));
        assert_eq!(parse_number("12,5"), Some(12.5));
        assert_eq!(parse_number("-1.234,5"), Some(-1234.5));
    }

    #[test]
    fn test_parse_number_irregular_grouping() {
        assert_eq!(parse_number("1,23,4"), None);
        assert_eq!(parse_number("12.34.5"), None);
        assert_eq!(parse_number("1.23,45"), None);
        assert_eq!(parse_number("1,2.3,4"), None);
    }

    #[test]
    fn test_map_orders_basic() {
        let groups = SpreadsheetFieldMapper.map_orders(vec![order_row(2)]).unwrap();

        assert_eq!(groups.len(), 1);
        let g = &groups[0];
        assert_eq!(g.cliente, "Ana Torres");
        assert_eq!(g.direccion, "Av. Larco 123");
        assert_eq!(g.items.len(), 1);
        assert_eq!(g.items[0].precio_unitario, 10.5);
        assert_eq!(g.monto_total, 21.0);
        assert!(!g.total_manual);
    }

    #[test]
    fn test_map_orders_merges_continuation_rows() {
        let extra = RawRow::new(3)
            .with("Producto", "Gorra")
            .with("Cantidad", "1")
            .with("Precio unitario", "5");

        let groups = SpreadsheetFieldMapper
            .map_orders(vec![order_row(2), extra, order_row(4)])
            .unwrap();

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].items.len(), 2);
        assert_eq!(groups[0].monto_total, 26.0);
    }

    #[test]
    fn test_map_orders_declared_total_kept_as_manual() {
        let row = order_row(2).with("Monto total", "30");
        let groups = SpreadsheetFieldMapper.map_orders(vec![row]).unwrap();
        assert_eq!(groups[0].monto_total, 30.0);
        assert!(groups[0].total_manual);
    }

    #[test]
    fn test_map_orders_invalid_number_becomes_nan() {
        let row = order_row(2).with("Cantidad", "dos");
        let groups = SpreadsheetFieldMapper.map_orders(vec![row]).unwrap();
        assert!(groups[0].items[0].cantidad.is_nan());
    }

    #[test]
    fn test_map_products() {
        let row = RawRow::new(2)
            .with("Nombre", "Polo básico")
            .with("Categoría", "Ropa")
            .with("Almacén", "Almacén Central")
            .with("Precio", "25.9")
            .with("Stock", "40")
            .with("Stock mínimo", "5")
            .with("Peso", "0,3");

        let rows = SpreadsheetFieldMapper.map_products(vec![row]).unwrap();
        let p = &rows[0];
        assert_eq!(p.nombre, "Polo básico");
        assert_eq!(p.almacen, "Almacén Central");
        assert_eq!(p.stock, 40.0);
        assert_eq!(p.stock_minimo, 5.0);
        assert_eq!(p.peso, 0.3);
    }

    #[test]
    fn test_map_products_irregular_price_reported_not_finite() {
        use crate::domain::reference::ReferenceSets;
        use crate::domain::types::FieldKey;
        use crate::importer::row_validator::RowValidator;

        let row = RawRow::new(2)
            .with("Nombre", "Casaca")
            .with("Precio", "1,23,4")
            .with("Stock", "1.200");

        let rows = SpreadsheetFieldMapper.map_products(vec![row]).unwrap();
        assert!(rows[0].precio.is_nan());
        assert_eq!(rows[0].stock, 1.2);

        let outcome = RowValidator.validate_product(&rows[0], &ReferenceSets::default());
        assert!(outcome.has_issue(FieldKey::Precio, "not_finite"));
    }
}
