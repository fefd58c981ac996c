// ==========================================
// TIKTUY - 对账（cuadre de saldo）领域模型
// ==========================================
// 用途: 骑手/物流公司/电商之间的每日现金对账
// 本模块只覆盖“批量重新校验”所需字段
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CuadreEstado {
    Pendiente,  // 待对账
    Validado,   // 已校验（可重新校验）
    Finalizado, // 已结清，不可再操作
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CuadreRow {
    pub id: i64,
    pub fecha: NaiveDate,
    #[serde(default)]
    pub motorizado: Option<String>,
    pub monto: f64,
    pub estado: CuadreEstado,
}

impl CuadreRow {
    pub fn is_finalized(&self) -> bool {
        matches!(self.estado, CuadreEstado::Finalizado)
    }
}

/// 凭证附件（上传时使用 multipart）
#[derive(Debug, Clone, PartialEq)]
pub struct Voucher {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}
