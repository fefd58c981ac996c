// ==========================================
// TIKTUY 批量导入 - 参照解析
// ==========================================
// 职责: 名称 → 参照 ID / 库存 / 目录价格
// 说明: 校验器不读取这里写入的 ID，解析结果只用于展示与提交载荷
// ==========================================

use crate::domain::preview::{LineItem, OrderGroup, ProductRow};
use crate::domain::reference::{Producto, ReferenceSets};

/// 解析订单组的站点与明细商品
///
/// # 规则
/// - 表格未给单价（0）时采用目录价格
/// - 金额未被人工修改时重算
pub fn resolve_order(group: &mut OrderGroup, refs: &ReferenceSets) {
    group.sede_id = refs.find_sede(&group.sede).map(|s| s.id);
    let sede_id = group.sede_id;

    for item in group.items.iter_mut() {
        match site_producto(refs, sede_id, &item.producto) {
            Some(producto) => {
                item.producto_id = Some(producto.id);
                item.stock = producto.stock;
                if item.precio_unitario == 0.0 {
                    item.precio_unitario = producto.precio;
                }
            }
            None => {
                item.producto_id = None;
                item.stock = None;
            }
        }
    }

    if !group.total_manual {
        group.recompute_total();
    }
}

/// 站点未解析时不取记录: 并集中的同名商品可能属于任意站点
fn site_producto<'a>(refs: &'a ReferenceSets, sede_id: Option<i64>, name: &str) -> Option<&'a Producto> {
    sede_id.and_then(|id| refs.find_producto_in_sede(id, name))
}

/// 明确更换商品: 按所属站点重新解析并采用目录价格
///
/// 同名商品在不同站点可能是不同记录，价格和库存也不同
pub fn assign_product(item: &mut LineItem, sede_id: Option<i64>, name: &str, refs: &ReferenceSets) {
    item.producto = name.trim().to_string();
    match site_producto(refs, sede_id, name) {
        Some(producto) => {
            item.producto_id = Some(producto.id);
            item.stock = producto.stock;
            item.precio_unitario = producto.precio;
        }
        None => {
            item.producto_id = None;
            item.stock = None;
        }
    }
}

/// 解析商品行的分类与仓库
pub fn resolve_product(row: &mut ProductRow, refs: &ReferenceSets) {
    row.categoria_id = refs.find_categoria(&row.categoria).map(|c| c.id);
    row.almacen_id = refs.find_almacen(&row.almacen).map(|a| a.id);
}
