// ==========================================
// TIKTUY 批量导入 - 后端 HTTP 客户端
// ==========================================
// 职责: 预览上传 / 参照列表 / 批量提交 / 对账凭证上传
// 认证: 每个请求携带 Authorization: Bearer <token>（会话显式传入）
// 红线: 非 2xx 响应的错误消息原样透出
// ==========================================

use crate::api::dto::{
    CommitSummary, CuadreAck, Envelope, OrderCommitRequest, OrderPreviewResponse,
    ProductCommitRequest, ProductPreviewResponse,
};
use crate::api::error::{ApiError, ApiResult};
use crate::api::session::Session;
use crate::config::config_manager::{ClientConfig, Endpoints};
use crate::domain::cuadre::Voucher;
use crate::domain::preview::{OrderGroup, ProductRow};
use crate::domain::reference::{Almacen, Categoria, Courier, Producto, Sede, Zona};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::SpreadsheetFile;
use crate::importer::import_traits::{ImportBackend, PreviewSource, ReferenceSource};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, error, instrument};

pub struct TiktuyApiClient {
    client: Client,
    base_url: String,
    endpoints: Endpoints,
}

impl TiktuyApiClient {
    pub fn new(config: &ClientConfig) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            endpoints: config.endpoints.clone(),
        })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorized(&self, builder: RequestBuilder, session: &Session) -> ApiResult<RequestBuilder> {
        if !session.has_token() {
            return Err(ApiError::Unauthorized("sesión sin token".to_string()));
        }
        Ok(builder
            .bearer_auth(&session.token)
            .header("Accept", "application/json"))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> ApiResult<T> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            error!(status = status.as_u16(), "后端返回错误");
            return Err(ApiError::from_response_body(status.as_u16(), &body));
        }

        let preview: String = body.chars().take(300).collect();
        debug!(status = status.as_u16(), body = %preview, "后端响应");
        Ok(serde_json::from_str(&body)?)
    }

    async fn get_list<T: DeserializeOwned>(&self, session: &Session, path: &str) -> ApiResult<Vec<T>> {
        let request = self.authorized(self.client.get(self.url(path)), session)?;
        let envelope: Envelope<Vec<T>> = self.send(request).await?;
        Ok(envelope.into_inner())
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        session: &Session,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        let request = self.authorized(self.client.post(self.url(path)).json(body), session)?;
        self.send(request).await
    }

    async fn post_file<T: DeserializeOwned>(
        &self,
        session: &Session,
        path: &str,
        file: &SpreadsheetFile,
    ) -> ApiResult<T> {
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str(file.mime_type())?;
        let form = Form::new().part("file", part);
        let request = self.authorized(self.client.post(self.url(path)).multipart(form), session)?;
        self.send(request).await
    }

    /// 对账批量重新校验（multipart: ids + voucher）
    #[instrument(skip(self, session, voucher), fields(count = ids.len(), voucher = %voucher.file_name))]
    pub async fn validar_cuadre(
        &self,
        session: &Session,
        ids: &[i64],
        voucher: &Voucher,
    ) -> ApiResult<CuadreAck> {
        let voucher_part = Part::bytes(voucher.bytes.clone())
            .file_name(voucher.file_name.clone())
            .mime_str(&voucher.mime_type)?;
        let form = Form::new()
            .text("ids", serde_json::to_string(ids)?)
            .part("voucher", voucher_part);
        let request = self.authorized(
            self.client
                .post(self.url(&self.endpoints.cuadre_validar))
                .multipart(form),
            session,
        )?;
        self.send(request).await
    }
}

fn preview_error(err: ApiError) -> ImportError {
    ImportError::PreviewFailed(err.user_message())
}

#[async_trait]
impl PreviewSource for TiktuyApiClient {
    #[instrument(skip(self, session, file), fields(file = %file.file_name))]
    async fn preview_orders(
        &self,
        session: &Session,
        file: &SpreadsheetFile,
    ) -> ImportResult<Vec<OrderGroup>> {
        file.ensure_supported()?;
        let response: OrderPreviewResponse = self
            .post_file(session, &self.endpoints.order_preview, file)
            .await
            .map_err(preview_error)?;
        Ok(response.into_groups())
    }

    #[instrument(skip(self, session, file), fields(file = %file.file_name))]
    async fn preview_products(
        &self,
        session: &Session,
        file: &SpreadsheetFile,
    ) -> ImportResult<Vec<ProductRow>> {
        file.ensure_supported()?;
        let response: ProductPreviewResponse = self
            .post_file(session, &self.endpoints.product_preview, file)
            .await
            .map_err(preview_error)?;
        Ok(response.into_rows())
    }
}

#[async_trait]
impl ReferenceSource for TiktuyApiClient {
    async fn fetch_couriers(&self, session: &Session) -> ApiResult<Vec<Courier>> {
        self.get_list(session, &self.endpoints.couriers).await
    }

    async fn fetch_sedes(&self, session: &Session) -> ApiResult<Vec<Sede>> {
        self.get_list(session, &self.endpoints.sedes).await
    }

    async fn fetch_categorias(&self, session: &Session) -> ApiResult<Vec<Categoria>> {
        self.get_list(session, &self.endpoints.categorias).await
    }

    async fn fetch_almacenes(&self, session: &Session) -> ApiResult<Vec<Almacen>> {
        self.get_list(session, &self.endpoints.almacenes).await
    }

    async fn fetch_productos(&self, session: &Session, sede_id: i64) -> ApiResult<Vec<Producto>> {
        let path = Endpoints::with_id(&self.endpoints.productos_por_sede, sede_id);
        let mut productos: Vec<Producto> = self.get_list(session, &path).await?;
        // 后端不一定回填站点
        for p in productos.iter_mut() {
            p.sede_id.get_or_insert(sede_id);
        }
        Ok(productos)
    }

    async fn fetch_zonas(&self, session: &Session, sede_id: i64) -> ApiResult<Vec<Zona>> {
        let path = Endpoints::with_id(&self.endpoints.zonas_por_sede, sede_id);
        let mut zonas: Vec<Zona> = self.get_list(session, &path).await?;
        for z in zonas.iter_mut() {
            z.sede_id.get_or_insert(sede_id);
        }
        Ok(zonas)
    }
}

#[async_trait]
impl ImportBackend for TiktuyApiClient {
    async fn commit_orders(
        &self,
        session: &Session,
        request: &OrderCommitRequest,
    ) -> ApiResult<CommitSummary> {
        self.post_json(session, &self.endpoints.order_commit, request)
            .await
    }

    async fn commit_products(
        &self,
        session: &Session,
        request: &ProductCommitRequest,
    ) -> ApiResult<CommitSummary> {
        self.post_json(session, &self.endpoints.product_commit, request)
            .await
    }
}
