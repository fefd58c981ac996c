// ==========================================
// TIKTUY 批量导入 - 导入流程编排
// ==========================================
// 流程: 上传预览 ∥ 参照加载 → 审核会话 → 提交
// 依赖: PreviewSource / ReferenceSource / ImportBackend（显式注入）
// ==========================================

use crate::api::dto::CommitSummary;
use crate::api::session::Session;
use crate::config::import_rules::ImportRulesReader;
use crate::domain::preview::{OrderGroup, ProductRow};
use crate::domain::reference::ReferenceSets;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_mapper::SpreadsheetFieldMapper;
use crate::importer::file_parser::{SpreadsheetFile, UniversalFileParser};
use crate::importer::import_traits::{FieldMapper, ImportBackend, PreviewSource, ReferenceSource};
use crate::importer::reference_aggregator::ReferenceLoader;
use crate::importer::review_session::{LoadTicket, ReviewSession, ReviewState};
use crate::importer::row_validator::PreviewRow;
use crate::importer::submitter::{
    prepare_order_submission, prepare_product_submission, CommitSubmitter, ImportTarget,
    SubmitError,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, instrument};

// ==========================================
// LocalPreviewSource - 本地解析预览
// ==========================================
// 用途: 离线预览 / CLI；与后端预览使用相同的列名映射
pub struct LocalPreviewSource {
    parser: UniversalFileParser,
    mapper: Box<dyn FieldMapper>,
}

impl Default for LocalPreviewSource {
    fn default() -> Self {
        Self {
            parser: UniversalFileParser,
            mapper: Box::new(SpreadsheetFieldMapper),
        }
    }
}

#[async_trait]
impl PreviewSource for LocalPreviewSource {
    async fn preview_orders(
        &self,
        _session: &Session,
        file: &SpreadsheetFile,
    ) -> ImportResult<Vec<OrderGroup>> {
        let raw = self.parser.parse(file)?;
        self.mapper.map_orders(raw)
    }

    async fn preview_products(
        &self,
        _session: &Session,
        file: &SpreadsheetFile,
    ) -> ImportResult<Vec<ProductRow>> {
        let raw = self.parser.parse(file)?;
        self.mapper.map_products(raw)
    }
}

// ==========================================
// ImportServices - 流程依赖
// ==========================================
#[derive(Clone)]
pub struct ImportServices {
    pub preview: Arc<dyn PreviewSource>,
    pub references: Arc<dyn ReferenceSource>,
    pub backend: Arc<dyn ImportBackend>,
    pub rules: Arc<dyn ImportRulesReader>,
}

/// 上传结果写入会话（票据过期时丢弃）
fn settle_preview<T: PreviewRow>(
    review: &mut ReviewSession<T>,
    ticket: LoadTicket,
    rows: ImportResult<Vec<T>>,
    refs: ReferenceSets,
    max_rows: usize,
) -> ImportResult<()> {
    let rows = rows.and_then(|rows| {
        if rows.len() > max_rows {
            Err(ImportError::TooManyRows {
                rows: rows.len(),
                max: max_rows,
            })
        } else {
            Ok(rows)
        }
    });

    match rows {
        Ok(rows) => {
            review.finish_loading(ticket, rows, refs);
            Ok(())
        }
        Err(e) => {
            review.fail_loading(ticket, e.user_message());
            Err(e)
        }
    }
}

fn ensure_previewing<T: PreviewRow>(review: &ReviewSession<T>) -> Result<(), SubmitError> {
    if review.state() == ReviewState::Preview {
        Ok(())
    } else {
        Err(SubmitError::NothingToSubmit)
    }
}

// ==========================================
// OrderImportWorkflow - 订单导入
// ==========================================
pub struct OrderImportWorkflow {
    services: ImportServices,
    review: ReviewSession<OrderGroup>,
}

impl OrderImportWorkflow {
    pub fn new(services: ImportServices) -> Self {
        Self {
            services,
            review: ReviewSession::new(),
        }
    }

    pub fn review(&self) -> &ReviewSession<OrderGroup> {
        &self.review
    }

    pub fn review_mut(&mut self) -> &mut ReviewSession<OrderGroup> {
        &mut self.review
    }

    /// 打开预览: 上传解析与参照加载并发进行
    ///
    /// 上传失败为阻断性错误，预览不打开；参照失败只影响对应数据源
    #[instrument(skip(self, session, file), fields(file = %file.file_name))]
    pub async fn open(&mut self, session: &Session, file: SpreadsheetFile) -> ImportResult<()> {
        file.ensure_supported()?;
        let ticket = self.review.begin_loading()?;

        let loader = ReferenceLoader::new(self.services.references.as_ref());
        let (groups, refs) = tokio::join!(
            self.services.preview.preview_orders(session, &file),
            loader.load(session),
        );

        let max_rows = self.services.rules.import_rules().max_rows;
        settle_preview(&mut self.review, ticket, groups, refs, max_rows)
    }

    /// 提交（有选中行时只提交选中行）
    ///
    /// 前置检查失败时会话保持在预览状态，不发起网络请求
    #[instrument(skip(self, session, target))]
    pub async fn submit(
        &mut self,
        session: &Session,
        target: &ImportTarget,
    ) -> Result<CommitSummary, SubmitError> {
        ensure_previewing(&self.review)?;
        let request = prepare_order_submission(
            self.review.rows(),
            self.review.selection(),
            target,
            self.review.refs(),
            self.services.rules.as_ref(),
        )?;

        self.review
            .begin_submit()
            .map_err(|e| SubmitError::Backend(e.to_string()))?;

        let submitter = CommitSubmitter::new(self.services.backend.as_ref());
        match submitter.submit_orders(session, &request).await {
            Ok(summary) => {
                self.review
                    .submit_succeeded()
                    .map_err(|e| SubmitError::Backend(e.to_string()))?;
                info!(inserted = summary.inserted, "订单导入完成，预览关闭");
                Ok(summary)
            }
            Err(e) => {
                self.review
                    .submit_failed(e.user_message())
                    .map_err(|err| SubmitError::Backend(err.to_string()))?;
                Err(e)
            }
        }
    }

    pub fn close(&mut self) {
        self.review.close();
    }
}

// ==========================================
// ProductImportWorkflow - 商品导入
// ==========================================
pub struct ProductImportWorkflow {
    services: ImportServices,
    review: ReviewSession<ProductRow>,
}

impl ProductImportWorkflow {
    pub fn new(services: ImportServices) -> Self {
        Self {
            services,
            review: ReviewSession::new(),
        }
    }

    pub fn review(&self) -> &ReviewSession<ProductRow> {
        &self.review
    }

    pub fn review_mut(&mut self) -> &mut ReviewSession<ProductRow> {
        &mut self.review
    }

    #[instrument(skip(self, session, file), fields(file = %file.file_name))]
    pub async fn open(&mut self, session: &Session, file: SpreadsheetFile) -> ImportResult<()> {
        file.ensure_supported()?;
        let ticket = self.review.begin_loading()?;

        let loader = ReferenceLoader::new(self.services.references.as_ref());
        let (rows, refs) = tokio::join!(
            self.services.preview.preview_products(session, &file),
            loader.load(session),
        );

        let max_rows = self.services.rules.import_rules().max_rows;
        settle_preview(&mut self.review, ticket, rows, refs, max_rows)
    }

    #[instrument(skip(self, session))]
    pub async fn submit(&mut self, session: &Session) -> Result<CommitSummary, SubmitError> {
        ensure_previewing(&self.review)?;
        let request = prepare_product_submission(
            self.review.rows(),
            self.review.selection(),
            self.review.refs(),
            self.services.rules.as_ref(),
        )?;

        self.review
            .begin_submit()
            .map_err(|e| SubmitError::Backend(e.to_string()))?;

        let submitter = CommitSubmitter::new(self.services.backend.as_ref());
        match submitter.submit_products(session, &request).await {
            Ok(summary) => {
                self.review
                    .submit_succeeded()
                    .map_err(|e| SubmitError::Backend(e.to_string()))?;
                info!(inserted = summary.inserted, "商品导入完成，预览关闭");
                Ok(summary)
            }
            Err(e) => {
                self.review
                    .submit_failed(e.user_message())
                    .map_err(|err| SubmitError::Backend(err.to_string()))?;
                Err(e)
            }
        }
    }

    pub fn close(&mut self) {
        self.review.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::Role;

    #[tokio::test]
    async fn test_local_preview_source_parses_csv() {
        let csv = "Cliente,Sede,Distrito,Dirección,Producto,Cantidad,Precio unitario\n\
                   Ana,Lima,Surco,Calle 1,Polo,2,10.50\n\
                   ,,,,Gorra,1,5\n";
        let file = SpreadsheetFile::new("pedidos.csv", csv.as_bytes().to_vec());
        let session = Session::new("token", Role::Ecommerce);

        let groups = LocalPreviewSource::default()
            .preview_orders(&session, &file)
            .await
            .unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].items.len(), 2);
        assert_eq!(groups[0].monto_total, 26.0);
    }
}
