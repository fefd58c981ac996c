// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 参照数据构造、Mock 数据源与 Mock 后端
// ==========================================

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tiktuy_import::api::dto::{CommitSummary, OrderCommitRequest, ProductCommitRequest};
use tiktuy_import::api::{ApiError, Session};
use tiktuy_import::api::error::ApiResult;
use tiktuy_import::config::ImportRules;
use tiktuy_import::domain::{
    Almacen, Categoria, Courier, LineItem, OrderGroup, ProductRow, Producto, ReferenceKind, Role,
    Sede, Zona,
};
use tiktuy_import::importer::{
    ImportBackend, ImportResult, ImportServices, PreviewSource, ReferenceSource, SpreadsheetFile,
};
use tiktuy_import::ImportError;

// ==========================================
// 参照数据构造
// ==========================================

pub const SEDE_LIMA: i64 = 1;
pub const SEDE_AREQUIPA: i64 = 2;

pub fn test_session() -> Session {
    Session::new("test-token", Role::Ecommerce)
}

pub fn sedes() -> Vec<Sede> {
    vec![
        Sede {
            id: SEDE_LIMA,
            nombre: "Lima".to_string(),
            courier_id: Some(3),
            ciudad: Some("Lima".to_string()),
        },
        Sede {
            id: SEDE_AREQUIPA,
            nombre: "Arequipa".to_string(),
            courier_id: Some(3),
            ciudad: None,
        },
    ]
}

pub fn productos(sede_id: i64) -> Vec<Producto> {
    match sede_id {
        SEDE_LIMA => vec![
            Producto {
                id: 10,
                nombre: "Polo Básico".to_string(),
                precio: 10.5,
                stock: Some(5.0),
                sede_id: Some(SEDE_LIMA),
            },
            Producto {
                id: 11,
                nombre: "Gorra".to_string(),
                precio: 5.0,
                stock: Some(20.0),
                sede_id: Some(SEDE_LIMA),
            },
        ],
        _ => vec![Producto {
            id: 20,
            nombre: "Polo Básico".to_string(),
            precio: 12.0,
            stock: Some(1.0),
            sede_id: Some(sede_id),
        }],
    }
}

pub fn zonas(sede_id: i64) -> Vec<Zona> {
    match sede_id {
        SEDE_LIMA => vec![
            Zona {
                id: 100,
                distrito: "Miraflores".to_string(),
                tarifa: 8.0,
                sede_id: Some(SEDE_LIMA),
            },
            Zona {
                id: 101,
                distrito: "San Juan de Lurigancho".to_string(),
                tarifa: 10.0,
                sede_id: Some(SEDE_LIMA),
            },
        ],
        _ => vec![Zona {
            id: 200,
            distrito: "Cayma".to_string(),
            tarifa: 7.0,
            sede_id: Some(sede_id),
        }],
    }
}

/// 合法订单（Lima / Miraflores / Polo Básico）
pub fn valid_order(cliente: &str) -> OrderGroup {
    let mut group = OrderGroup::new(cliente);
    group.telefono = "999888777".to_string();
    group.sede = "Lima".to_string();
    group.distrito = "miraflores".to_string();
    group.direccion = "Av. Larco 123".to_string();
    group.fecha_entrega = "15/03/2026".to_string();
    group.items = vec![LineItem::new("polo basico", 2.0, 10.5)];
    group.recompute_total();
    group
}

/// 合法商品（Ropa / Almacén Central）
pub fn valid_product(nombre: &str) -> ProductRow {
    let mut row = ProductRow::new(nombre);
    row.categoria = "Ropa".to_string();
    row.almacen = "Almacén Central".to_string();
    row.precio = 25.0;
    row.stock = 10.0;
    row.stock_minimo = 2.0;
    row.peso = 0.3;
    row
}

pub fn csv_file() -> SpreadsheetFile {
    SpreadsheetFile::new("pedidos.csv", b"Cliente\nAna\n".to_vec())
}

// ==========================================
// MockReferenceSource - 可配置失败的参照数据源
// ==========================================
#[derive(Default)]
pub struct MockReferenceSource {
    failing: HashSet<ReferenceKind>,
}

impl MockReferenceSource {
    pub fn failing(kinds: &[ReferenceKind]) -> Self {
        Self {
            failing: kinds.iter().copied().collect(),
        }
    }

    fn check(&self, kind: ReferenceKind) -> ApiResult<()> {
        if self.failing.contains(&kind) {
            Err(ApiError::Status {
                status: 500,
                message: format!("{} caído", kind),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ReferenceSource for MockReferenceSource {
    async fn fetch_couriers(&self, _session: &Session) -> ApiResult<Vec<Courier>> {
        self.check(ReferenceKind::Couriers)?;
        Ok(vec![Courier {
            id: 3,
            nombre: "Rápido SAC".to_string(),
        }])
    }

    async fn fetch_sedes(&self, _session: &Session) -> ApiResult<Vec<Sede>> {
        self.check(ReferenceKind::Sedes)?;
        Ok(sedes())
    }

    async fn fetch_categorias(&self, _session: &Session) -> ApiResult<Vec<Categoria>> {
        self.check(ReferenceKind::Categorias)?;
        Ok(vec![Categoria {
            id: 1,
            nombre: "Ropa".to_string(),
        }])
    }

    async fn fetch_almacenes(&self, _session: &Session) -> ApiResult<Vec<Almacen>> {
        self.check(ReferenceKind::Almacenes)?;
        Ok(vec![Almacen {
            id: 7,
            nombre: "Almacén Central".to_string(),
        }])
    }

    async fn fetch_productos(&self, _session: &Session, sede_id: i64) -> ApiResult<Vec<Producto>> {
        self.check(ReferenceKind::Productos)?;
        Ok(productos(sede_id))
    }

    async fn fetch_zonas(&self, _session: &Session, sede_id: i64) -> ApiResult<Vec<Zona>> {
        self.check(ReferenceKind::Zonas)?;
        Ok(zonas(sede_id))
    }
}

// ==========================================
// MockPreviewSource - 固定预览结果
// ==========================================
#[derive(Default)]
pub struct MockPreviewSource {
    pub orders: Vec<OrderGroup>,
    pub products: Vec<ProductRow>,
    pub failure: Option<String>,
}

impl MockPreviewSource {
    pub fn with_orders(orders: Vec<OrderGroup>) -> Self {
        Self {
            orders,
            ..Default::default()
        }
    }

    pub fn with_products(products: Vec<ProductRow>) -> Self {
        Self {
            products,
            ..Default::default()
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Default::default()
        }
    }

    fn check(&self) -> ImportResult<()> {
        match &self.failure {
            Some(message) => Err(ImportError::PreviewFailed(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl PreviewSource for MockPreviewSource {
    async fn preview_orders(
        &self,
        _session: &Session,
        _file: &SpreadsheetFile,
    ) -> ImportResult<Vec<OrderGroup>> {
        self.check()?;
        Ok(self.orders.clone())
    }

    async fn preview_products(
        &self,
        _session: &Session,
        _file: &SpreadsheetFile,
    ) -> ImportResult<Vec<ProductRow>> {
        self.check()?;
        Ok(self.products.clone())
    }
}

// ==========================================
// MockBackend - 记录提交请求
// ==========================================
#[derive(Default)]
pub struct MockBackend {
    pub calls: AtomicUsize,
    pub last_orders: Mutex<Option<OrderCommitRequest>>,
    pub last_products: Mutex<Option<ProductCommitRequest>>,
    pub failure: Option<String>,
}

impl MockBackend {
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Default::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn respond(&self, inserted: usize) -> ApiResult<CommitSummary> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(message) => Err(ApiError::Status {
                status: 422,
                message: message.clone(),
            }),
            None => Ok(CommitSummary {
                inserted,
                message: None,
            }),
        }
    }
}

#[async_trait]
impl ImportBackend for MockBackend {
    async fn commit_orders(
        &self,
        _session: &Session,
        request: &OrderCommitRequest,
    ) -> ApiResult<CommitSummary> {
        *self.last_orders.lock().unwrap() = Some(request.clone());
        self.respond(request.pedidos.len())
    }

    async fn commit_products(
        &self,
        _session: &Session,
        request: &ProductCommitRequest,
    ) -> ApiResult<CommitSummary> {
        *self.last_products.lock().unwrap() = Some(request.clone());
        self.respond(request.productos.len())
    }
}

/// 组装流程依赖
pub fn services(
    preview: MockPreviewSource,
    references: MockReferenceSource,
    backend: Arc<MockBackend>,
) -> ImportServices {
    ImportServices {
        preview: Arc::new(preview),
        references: Arc::new(references),
        backend,
        rules: Arc::new(ImportRules::default()),
    }
}
