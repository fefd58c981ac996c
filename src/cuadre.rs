// ==========================================
// TIKTUY - 对账批量重新校验
// ==========================================
// 职责: 选择未结清的对账行 + 上传凭证
// 红线: 已结清（FINALIZADO）的行不可选，全选时自动跳过
// 红线: 没有凭证文件时不发起请求
// ==========================================

use crate::api::client::TiktuyApiClient;
use crate::api::dto::CuadreAck;
use crate::api::error::ApiResult;
use crate::api::session::Session;
use crate::domain::cuadre::{CuadreRow, Voucher};
use crate::i18n::t;
use crate::importer::bulk_apply::SelectionState;
use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, instrument, warn};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CuadreError {
    #[error("未选择可校验的对账记录")]
    NothingSelected,

    #[error("缺少凭证文件")]
    MissingVoucher,

    #[error("{0}")]
    Backend(String),
}

impl CuadreError {
    pub fn user_message(&self) -> String {
        match self {
            CuadreError::NothingSelected => t("cuadre.nothing_selected"),
            CuadreError::MissingVoucher => t("cuadre.missing_voucher"),
            CuadreError::Backend(message) => message.clone(),
        }
    }
}

/// 对账重新校验接口
#[async_trait]
pub trait CuadreBackend: Send + Sync {
    async fn validar(&self, session: &Session, ids: &[i64], voucher: &Voucher) -> ApiResult<CuadreAck>;
}

#[async_trait]
impl CuadreBackend for TiktuyApiClient {
    async fn validar(&self, session: &Session, ids: &[i64], voucher: &Voucher) -> ApiResult<CuadreAck> {
        self.validar_cuadre(session, ids, voucher).await
    }
}

#[derive(Debug, Clone, Default)]
pub struct CuadreBatch {
    rows: Vec<CuadreRow>,
    selection: SelectionState,
}

impl CuadreBatch {
    pub fn new(rows: Vec<CuadreRow>) -> Self {
        Self {
            rows,
            selection: SelectionState::new(),
        }
    }

    pub fn rows(&self) -> &[CuadreRow] {
        &self.rows
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    /// 切换选中（已结清的行不可选）
    pub fn toggle(&mut self, index: usize) -> bool {
        match self.rows.get(index) {
            Some(row) if !row.is_finalized() => self.selection.toggle(index),
            _ => false,
        }
    }

    /// 全选未结清的行
    pub fn select_all(&mut self) -> usize {
        self.selection
            .select_all_eligible(&self.rows, |row| !row.is_finalized())
    }

    pub fn clear(&mut self) {
        self.selection.clear();
    }

    pub fn selected_ids(&self) -> Vec<i64> {
        self.selection
            .iter()
            .filter_map(|i| self.rows.get(i))
            .filter(|row| !row.is_finalized())
            .map(|row| row.id)
            .collect()
    }

    pub fn selected_total(&self) -> f64 {
        crate::domain::round_money(
            self.selection
                .iter()
                .filter_map(|i| self.rows.get(i))
                .map(|row| row.monto)
                .sum(),
        )
    }

    /// 提交前检查
    pub fn validate(&self, voucher: Option<&Voucher>) -> Result<Vec<i64>, CuadreError> {
        let ids = self.selected_ids();
        if ids.is_empty() {
            return Err(CuadreError::NothingSelected);
        }
        match voucher {
            Some(v) if !v.bytes.is_empty() => Ok(ids),
            _ => Err(CuadreError::MissingVoucher),
        }
    }

    /// 上传凭证并重新校验选中记录
    #[instrument(skip(self, backend, session, voucher))]
    pub async fn submit(
        &mut self,
        backend: &dyn CuadreBackend,
        session: &Session,
        voucher: Option<&Voucher>,
    ) -> Result<CuadreAck, CuadreError> {
        let ids = self.validate(voucher)?;
        let voucher = voucher.ok_or(CuadreError::MissingVoucher)?;

        match backend.validar(session, &ids, voucher).await {
            Ok(ack) => {
                info!(count = ids.len(), updated = ack.updated, "对账重新校验完成");
                self.selection.clear();
                Ok(ack)
            }
            Err(e) => {
                warn!(error = %e, "对账重新校验失败");
                Err(CuadreError::Backend(e.user_message()))
            }
        }
    }
}
