// ==========================================
// TIKTUY 批量导入 - 接口数据结构
// ==========================================
// 对齐: 后端导入接口（预览 / 提交 / 参照列表）
// ==========================================

use crate::domain::preview::{OrderGroup, ProductRow};
use serde::{Deserialize, Serialize};

// ==========================================
// 通用响应包装
// ==========================================
// 后端部分接口返回 {"data": ...}，部分直接返回数组
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Envelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Envelope<T> {
    pub fn into_inner(self) -> T {
        match self {
            Envelope::Wrapped { data } => data,
            Envelope::Bare(data) => data,
        }
    }
}

// ==========================================
// 预览响应
// ==========================================
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OrderPreviewResponse {
    Grouped {
        #[serde(alias = "grupos", alias = "data", alias = "preview")]
        groups: Vec<OrderGroup>,
    },
    Bare(Vec<OrderGroup>),
}

impl OrderPreviewResponse {
    pub fn into_groups(self) -> Vec<OrderGroup> {
        match self {
            OrderPreviewResponse::Grouped { groups } => groups,
            OrderPreviewResponse::Bare(groups) => groups,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ProductPreviewResponse {
    Wrapped {
        #[serde(alias = "productos", alias = "data", alias = "preview")]
        rows: Vec<ProductRow>,
    },
    Bare(Vec<ProductRow>),
}

impl ProductPreviewResponse {
    pub fn into_rows(self) -> Vec<ProductRow> {
        match self {
            ProductPreviewResponse::Wrapped { rows } => rows,
            ProductPreviewResponse::Bare(rows) => rows,
        }
    }
}

// ==========================================
// 提交载荷（已归一化）
// ==========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub producto_id: Option<i64>,
    pub producto: String,
    pub cantidad: u32,
    pub precio_unitario: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPayload {
    pub cliente: String,
    pub telefono: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sede_id: Option<i64>,
    pub sede: String,
    pub distrito: String,
    pub direccion: String,
    pub referencia: String,
    pub fecha_entrega: Option<String>, // ISO YYYY-MM-DD
    pub monto_total: f64,
    pub items: Vec<ItemPayload>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCommitRequest {
    pub batch_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub courier_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trabajador_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estado: Option<String>,
    pub pedidos: Vec<OrderPayload>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductPayload {
    pub nombre: String,
    pub descripcion: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categoria_id: Option<i64>,
    pub categoria: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub almacen_id: Option<i64>,
    pub almacen: String,
    pub precio: f64,
    pub stock: u32,
    pub stock_minimo: u32,
    pub peso: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductCommitRequest {
    pub batch_id: String,
    pub productos: Vec<ProductPayload>,
}

// ==========================================
// 提交结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CommitSummary {
    #[serde(default, alias = "insertados", alias = "created")]
    pub inserted: usize,
    #[serde(default, alias = "mensaje")]
    pub message: Option<String>,
}

/// 对账重新校验结果
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CuadreAck {
    #[serde(default, alias = "actualizados", alias = "updated_count")]
    pub updated: usize,
    #[serde(default, alias = "mensaje")]
    pub message: Option<String>,
}
