// ==========================================
// TIKTUY 批量导入 - 导入管道 Trait
// ==========================================
// 职责: 定义导入管道各阶段接口（不包含实现）
// 阶段: 文件解析 → 字段映射 → 参照加载 → 行校验 → 提交
// ==========================================

use crate::api::dto::{CommitSummary, OrderCommitRequest, ProductCommitRequest};
use crate::api::error::ApiResult;
use crate::api::session::Session;
use crate::domain::preview::{OrderGroup, ProductRow};
use crate::domain::reference::{Almacen, Categoria, Courier, Producto, Sede, Zona};
use crate::importer::error::ImportResult;
use crate::importer::file_parser::{RawRow, SpreadsheetFile};
use async_trait::async_trait;
use std::path::Path;

// ==========================================
// FileParser Trait
// ==========================================
// 用途: 本地文件解析（离线预览 / CLI）
// 实现者: CsvParser, ExcelParser
pub trait FileParser: Send + Sync {
    /// 解析文件为原始行记录
    ///
    /// # 返回
    /// - Ok(Vec<RawRow>): 行记录（含原始行号，已跳过空白行）
    /// - Err: 文件不存在、格式错误
    fn parse_to_raw_records(&self, file_path: &Path) -> ImportResult<Vec<RawRow>>;
}

// ==========================================
// FieldMapper Trait
// ==========================================
// 用途: 原始行 → 预览行（列名别名 + 类型转换）
// 实现者: SpreadsheetFieldMapper
pub trait FieldMapper: Send + Sync {
    /// 订单行映射
    ///
    /// # 说明
    /// - 同一订单的多条明细（客户/地址列留空的续行）合并为一个 OrderGroup
    fn map_orders(&self, rows: Vec<RawRow>) -> ImportResult<Vec<OrderGroup>>;

    /// 商品行映射（一行一个商品）
    fn map_products(&self, rows: Vec<RawRow>) -> ImportResult<Vec<ProductRow>>;
}

// ==========================================
// PreviewSource Trait
// ==========================================
// 用途: 文件上传 → 后端解析预览（阶段 1）
// 实现者: TiktuyApiClient（远端）, LocalPreviewSource（本地）
#[async_trait]
pub trait PreviewSource: Send + Sync {
    async fn preview_orders(
        &self,
        session: &Session,
        file: &SpreadsheetFile,
    ) -> ImportResult<Vec<OrderGroup>>;

    async fn preview_products(
        &self,
        session: &Session,
        file: &SpreadsheetFile,
    ) -> ImportResult<Vec<ProductRow>>;
}

// ==========================================
// ReferenceSource Trait
// ==========================================
// 用途: 参照数据读取（阶段 2）
// 说明: 每个方法独立失败，由 ReferenceLoader 做错误隔离
#[async_trait]
pub trait ReferenceSource: Send + Sync {
    async fn fetch_couriers(&self, session: &Session) -> ApiResult<Vec<Courier>>;

    async fn fetch_sedes(&self, session: &Session) -> ApiResult<Vec<Sede>>;

    async fn fetch_categorias(&self, session: &Session) -> ApiResult<Vec<Categoria>>;

    async fn fetch_almacenes(&self, session: &Session) -> ApiResult<Vec<Almacen>>;

    /// 某站点下的商品
    async fn fetch_productos(&self, session: &Session, sede_id: i64) -> ApiResult<Vec<Producto>>;

    /// 某站点下的配送区域（区县 + 运费）
    async fn fetch_zonas(&self, session: &Session, sede_id: i64) -> ApiResult<Vec<Zona>>;
}

// ==========================================
// ImportBackend Trait
// ==========================================
// 用途: 提交导入（阶段 5），后端按请求原子处理
#[async_trait]
pub trait ImportBackend: Send + Sync {
    async fn commit_orders(
        &self,
        session: &Session,
        request: &OrderCommitRequest,
    ) -> ApiResult<CommitSummary>;

    async fn commit_products(
        &self,
        session: &Session,
        request: &ProductCommitRequest,
    ) -> ApiResult<CommitSummary>;
}
