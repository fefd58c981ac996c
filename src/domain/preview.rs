// ==========================================
// TIKTUY 批量导入 - 预览行模型
// ==========================================
// 用途: 导入预览阶段的中间结构（解析响应 → 此结构 → 人工修正 → 提交）
// 生命周期: 仅在一次预览会话内，关闭或提交成功即丢弃
// 标识: 位置下标（提交前没有持久 ID）
// ==========================================

use crate::domain::types::ValidationOutcome;
use serde::{Deserialize, Serialize};

/// 金额保留两位小数
pub fn round_money(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ==========================================
// LineItem - 订单明细
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(default)]
    pub producto: String, // 商品名称（表格原文）
    #[serde(default)]
    pub cantidad: f64, // 数量（必须为正整数）
    #[serde(default)]
    pub precio_unitario: f64, // 单价

    // ===== 参照解析结果 =====
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub producto_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<f64>, // 已知库存（解析到商品后填充）
}

impl LineItem {
    pub fn new(producto: &str, cantidad: f64, precio_unitario: f64) -> Self {
        Self {
            producto: producto.to_string(),
            cantidad,
            precio_unitario,
            producto_id: None,
            stock: None,
        }
    }

    pub fn subtotal(&self) -> f64 {
        self.cantidad * self.precio_unitario
    }
}

// ==========================================
// OrderGroup - 订单预览组
// ==========================================
// 一个逻辑订单 = 表格中的一行或多行（同一客户的多条明细）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderGroup {
    // ===== 客户信息 =====
    #[serde(default)]
    pub cliente: String,
    #[serde(default)]
    pub telefono: String,

    // ===== 配送信息 =====
    #[serde(default)]
    pub sede: String, // 站点名称（表格原文）
    #[serde(default)]
    pub distrito: String,
    #[serde(default)]
    pub direccion: String,
    #[serde(default)]
    pub referencia: String,
    #[serde(default)]
    pub fecha_entrega: String, // 表格原文，提交时转 ISO

    // ===== 明细与金额 =====
    #[serde(default)]
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub monto_total: f64,
    #[serde(default)]
    pub total_manual: bool, // 金额是否被人工改过

    // ===== 参照解析结果 =====
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sede_id: Option<i64>,

    // ===== 校验结果（由调用方回写）=====
    #[serde(default)]
    pub validation: ValidationOutcome,
}

impl OrderGroup {
    pub fn new(cliente: &str) -> Self {
        Self {
            cliente: cliente.to_string(),
            telefono: String::new(),
            sede: String::new(),
            distrito: String::new(),
            direccion: String::new(),
            referencia: String::new(),
            fecha_entrega: String::new(),
            items: Vec::new(),
            monto_total: 0.0,
            total_manual: false,
            sede_id: None,
            validation: ValidationOutcome::default(),
        }
    }

    /// 明细合计 Σ cantidad × precio_unitario（保留两位小数）
    pub fn computed_total(&self) -> f64 {
        round_money(self.items.iter().map(LineItem::subtotal).sum())
    }

    /// 重算总额（明细变化后调用，覆盖人工金额）
    pub fn recompute_total(&mut self) {
        self.monto_total = self.computed_total();
        self.total_manual = false;
    }

    /// 人工修改总额
    pub fn set_manual_total(&mut self, total: f64) {
        self.monto_total = total;
        self.total_manual = true;
    }

    pub fn is_valid(&self) -> bool {
        self.validation.valid
    }
}

// ==========================================
// ProductRow - 商品预览行
// ==========================================
// 注意: 商品导入是在“创建库存”，库存不与现有库存比较
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRow {
    #[serde(default)]
    pub nombre: String,
    #[serde(default)]
    pub descripcion: String,
    #[serde(default)]
    pub categoria: String,
    #[serde(default)]
    pub almacen: String, // 仓库名称（表格原文）
    #[serde(default)]
    pub precio: f64,
    #[serde(default)]
    pub stock: f64,
    #[serde(default)]
    pub stock_minimo: f64,
    #[serde(default)]
    pub peso: f64,

    // ===== 参照解析结果 =====
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categoria_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub almacen_id: Option<i64>,

    #[serde(default)]
    pub validation: ValidationOutcome,
}

impl ProductRow {
    pub fn new(nombre: &str) -> Self {
        Self {
            nombre: nombre.to_string(),
            descripcion: String::new(),
            categoria: String::new(),
            almacen: String::new(),
            precio: 0.0,
            stock: 0.0,
            stock_minimo: 0.0,
            peso: 0.0,
            categoria_id: None,
            almacen_id: None,
            validation: ValidationOutcome::default(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.validation.valid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_money() {
        assert_eq!(round_money(31.499999), 31.5);
        assert_eq!(round_money(0.1 + 0.2), 0.3);
    }

    #[test]
    fn test_recompute_total_overrides_manual() {
        let mut group = OrderGroup::new("Ana");
        group.items.push(LineItem::new("Polo", 2.0, 10.5));
        group.items.push(LineItem::new("Gorra", 1.0, 4.25));
        group.set_manual_total(99.0);
        assert!(group.total_manual);

        group.recompute_total();
        assert_eq!(group.monto_total, 25.25);
        assert!(!group.total_manual);
    }

    #[test]
    fn test_deserialize_partial_group() {
        let json = r#"{"cliente":"Luis","distrito":"Miraflores","items":[{"producto":"Polo","cantidad":2}]}"#;
        let group: OrderGroup = serde_json::from_str(json).unwrap();
        assert_eq!(group.cliente, "Luis");
        assert_eq!(group.items[0].precio_unitario, 0.0);
        assert!(group.sede.is_empty());
    }

    #[test]
    fn test_new_rows_are_not_valid_until_validated() {
        assert!(!OrderGroup::new("Ana").is_valid());
        assert!(!ProductRow::new("Polo").is_valid());

        let group: OrderGroup = serde_json::from_str(r#"{"cliente":"Luis"}"#).unwrap();
        assert!(!group.is_valid());
    }
}
