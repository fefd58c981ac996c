// ==========================================
// TIKTUY 批量导入 - 提交器
// ==========================================
// 职责: 提交集合确定 → 前置检查 → 载荷归一化 → 单次批量提交
// 红线: 前置检查失败时不发起任何网络请求
// 红线: 后端错误消息原样透出，不重试
// ==========================================

use crate::api::dto::{
    CommitSummary, ItemPayload, OrderCommitRequest, OrderPayload, ProductCommitRequest,
    ProductPayload,
};
use crate::api::session::Session;
use crate::config::import_rules::ImportRulesReader;
use crate::domain::preview::{OrderGroup, ProductRow};
use crate::domain::reference::ReferenceSets;
use crate::domain::types::Role;
use crate::i18n::{t, t_with_args};
use crate::importer::bulk_apply::SelectionState;
use crate::importer::data_cleaner::DataCleaner;
use crate::importer::import_traits::ImportBackend;
use crate::importer::row_validator::PreviewRow;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

// ==========================================
// SubmitError - 提交错误
// ==========================================
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SubmitError {
    #[error("没有可提交的行")]
    NothingToSubmit,

    #[error("缺少必选项: {0}")]
    MissingSelector(&'static str),

    #[error("存在无效行: {0:?}")]
    InvalidRows(Vec<usize>),

    #[error("提交行数超出上限: {rows} > {max}")]
    TooManyRows { rows: usize, max: usize },

    /// 后端错误（原文）
    #[error("{0}")]
    Backend(String),
}

impl SubmitError {
    /// 面向用户的本地化消息
    pub fn user_message(&self) -> String {
        match self {
            SubmitError::NothingToSubmit => t("submit.nothing_to_submit"),
            SubmitError::MissingSelector(selector) => {
                t_with_args("submit.missing_selector", &[("selector", *selector)])
            }
            SubmitError::InvalidRows(indices) => {
                // 对用户展示 1 起始的行号
                let rows = indices
                    .iter()
                    .map(|i| (i + 1).to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                t_with_args("submit.invalid_rows", &[("rows", rows.as_str())])
            }
            SubmitError::TooManyRows { rows, max } => t_with_args(
                "submit.too_many_rows",
                &[("rows", rows.to_string().as_str()), ("max", max.to_string().as_str())],
            ),
            SubmitError::Backend(message) => message.clone(),
        }
    }
}

// ==========================================
// ImportTarget - 顶层选择项
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportTarget {
    pub role: Role,
    #[serde(default)]
    pub courier_id: Option<i64>,
    #[serde(default)]
    pub trabajador_id: Option<i64>,
    #[serde(default)]
    pub estado: Option<String>,
}

impl ImportTarget {
    /// 从会话派生（courier 角色自带 courier_id）
    pub fn for_session(session: &Session) -> Self {
        Self {
            role: session.role,
            courier_id: session.courier_id,
            trabajador_id: session.user_id,
            estado: None,
        }
    }

    pub fn with_courier(mut self, courier_id: i64) -> Self {
        self.courier_id = Some(courier_id);
        self
    }
}

/// 提交集合: 有选中行时为选中行，否则为全部行
pub fn submission_indices(row_count: usize, selection: &SelectionState) -> Vec<usize> {
    if selection.is_empty() {
        (0..row_count).collect()
    } else {
        selection.iter().filter(|i| *i < row_count).collect()
    }
}

fn check_size(count: usize, rules: &dyn ImportRulesReader) -> Result<(), SubmitError> {
    if count == 0 {
        return Err(SubmitError::NothingToSubmit);
    }
    let max = rules.import_rules().max_rows;
    if count > max {
        return Err(SubmitError::TooManyRows { rows: count, max });
    }
    Ok(())
}

fn check_valid<T: PreviewRow>(
    rows: &[T],
    indices: &[usize],
    refs: &ReferenceSets,
) -> Result<(), SubmitError> {
    let invalid: Vec<usize> = indices
        .iter()
        .copied()
        .filter(|&i| !rows[i].validate(refs).valid)
        .collect();
    if invalid.is_empty() {
        Ok(())
    } else {
        warn!(invalid = ?invalid, "提交集合中存在无效行");
        Err(SubmitError::InvalidRows(invalid))
    }
}

// ==========================================
// 订单提交准备
// ==========================================

/// 准备订单批量提交请求
///
/// # 检查顺序
/// 1. 提交集合为空 → NothingToSubmit
/// 2. admin/ecommerce 未选择 courier → MissingSelector
/// 3. 行数超出上限 → TooManyRows
/// 4. 任一行无效 → InvalidRows(下标列表)
pub fn prepare_order_submission(
    rows: &[OrderGroup],
    selection: &SelectionState,
    target: &ImportTarget,
    refs: &ReferenceSets,
    rules: &dyn ImportRulesReader,
) -> Result<OrderCommitRequest, SubmitError> {
    let indices = submission_indices(rows.len(), selection);
    if indices.is_empty() {
        return Err(SubmitError::NothingToSubmit);
    }

    if rules.import_rules().require_courier_for_orders
        && target.role.requires_courier_selector()
        && target.courier_id.is_none()
    {
        return Err(SubmitError::MissingSelector("courier"));
    }

    check_size(indices.len(), rules)?;
    check_valid(rows, &indices, refs)?;

    let mut pedidos = Vec::with_capacity(indices.len());
    let mut unconvertible = Vec::new();
    for &idx in &indices {
        match order_payload(&rows[idx], refs) {
            Some(payload) => pedidos.push(payload),
            None => unconvertible.push(idx),
        }
    }
    if !unconvertible.is_empty() {
        return Err(SubmitError::InvalidRows(unconvertible));
    }

    Ok(OrderCommitRequest {
        batch_id: Uuid::new_v4().to_string(),
        courier_id: target.courier_id,
        trabajador_id: target.trabajador_id,
        estado: target.estado.clone(),
        pedidos,
    })
}

/// 订单载荷归一化（数量或金额无法转换时返回 None）
fn order_payload(group: &OrderGroup, refs: &ReferenceSets) -> Option<OrderPayload> {
    let cleaner = DataCleaner;
    let sede_id = refs.find_sede(&group.sede).map(|s| s.id);

    let mut items = Vec::with_capacity(group.items.len());
    for item in &group.items {
        items.push(ItemPayload {
            producto_id: sede_id
                .and_then(|id| refs.find_producto_in_sede(id, &item.producto))
                .map(|p| p.id),
            producto: cleaner.clean_text(&item.producto),
            cantidad: cleaner.coerce_quantity(item.cantidad)?,
            precio_unitario: cleaner.coerce_money(item.precio_unitario)?,
        });
    }

    let fecha_entrega = match cleaner.normalize_null(&group.fecha_entrega) {
        Some(raw) => Some(cleaner.to_iso_date(&raw)?),
        None => None,
    };

    Some(OrderPayload {
        cliente: cleaner.clean_text(&group.cliente),
        telefono: cleaner.clean_text(&group.telefono),
        sede_id,
        sede: cleaner.clean_text(&group.sede),
        distrito: cleaner.clean_text(&group.distrito),
        direccion: cleaner.clean_text(&group.direccion),
        referencia: cleaner.clean_text(&group.referencia),
        fecha_entrega,
        monto_total: cleaner.coerce_money(group.monto_total)?,
        items,
    })
}

// ==========================================
// 商品提交准备
// ==========================================

/// 准备商品批量提交请求（无顶层必选项）
pub fn prepare_product_submission(
    rows: &[ProductRow],
    selection: &SelectionState,
    refs: &ReferenceSets,
    rules: &dyn ImportRulesReader,
) -> Result<ProductCommitRequest, SubmitError> {
    let indices = submission_indices(rows.len(), selection);
    check_size(indices.len(), rules)?;
    check_valid(rows, &indices, refs)?;

    let mut productos = Vec::with_capacity(indices.len());
    let mut unconvertible = Vec::new();
    for &idx in &indices {
        match product_payload(&rows[idx], refs) {
            Some(payload) => productos.push(payload),
            None => unconvertible.push(idx),
        }
    }
    if !unconvertible.is_empty() {
        return Err(SubmitError::InvalidRows(unconvertible));
    }

    Ok(ProductCommitRequest {
        batch_id: Uuid::new_v4().to_string(),
        productos,
    })
}

fn product_payload(row: &ProductRow, refs: &ReferenceSets) -> Option<ProductPayload> {
    let cleaner = DataCleaner;
    Some(ProductPayload {
        nombre: cleaner.clean_text(&row.nombre),
        descripcion: cleaner.clean_text(&row.descripcion),
        categoria_id: refs.find_categoria(&row.categoria).map(|c| c.id),
        categoria: cleaner.clean_text(&row.categoria),
        almacen_id: refs.find_almacen(&row.almacen).map(|a| a.id),
        almacen: cleaner.clean_text(&row.almacen),
        precio: cleaner.coerce_money(row.precio)?,
        stock: cleaner.coerce_quantity(row.stock)?,
        stock_minimo: cleaner.coerce_quantity(row.stock_minimo)?,
        peso: cleaner.coerce_money(row.peso)?,
    })
}

// ==========================================
// CommitSubmitter - 单次批量提交
// ==========================================
pub struct CommitSubmitter<'a, B: ImportBackend + ?Sized> {
    backend: &'a B,
}

impl<'a, B: ImportBackend + ?Sized> CommitSubmitter<'a, B> {
    pub fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    /// 提交订单批次
    #[instrument(skip(self, session, request), fields(batch_id = %request.batch_id, rows = request.pedidos.len()))]
    pub async fn submit_orders(
        &self,
        session: &Session,
        request: &OrderCommitRequest,
    ) -> Result<CommitSummary, SubmitError> {
        match self.backend.commit_orders(session, request).await {
            Ok(summary) => {
                info!(inserted = summary.inserted, "订单导入提交成功");
                Ok(summary)
            }
            Err(e) => {
                error!(error = %e, "订单导入提交失败");
                Err(SubmitError::Backend(e.user_message()))
            }
        }
    }

    /// 提交商品批次
    #[instrument(skip(self, session, request), fields(batch_id = %request.batch_id, rows = request.productos.len()))]
    pub async fn submit_products(
        &self,
        session: &Session,
        request: &ProductCommitRequest,
    ) -> Result<CommitSummary, SubmitError> {
        match self.backend.commit_products(session, request).await {
            Ok(summary) => {
                info!(inserted = summary.inserted, "商品导入提交成功");
                Ok(summary)
            }
            Err(e) => {
                error!(error = %e, "商品导入提交失败");
                Err(SubmitError::Backend(e.user_message()))
            }
        }
    }
}
