// ==========================================
// TIKTUY 批量导入 - 参照数据聚合
// ==========================================
// 职责: 并发加载参照数据，构建 ReferenceSets
// 红线: 每个数据源独立失败，失败源退化为空表，不阻塞其他数据源
// ==========================================

use crate::api::error::ApiResult;
use crate::api::session::Session;
use crate::domain::reference::{
    Named, Producto, ReferenceKind, ReferenceSets, ReferenceTable, Sede, SourceStatus, Zona,
};
use crate::importer::import_traits::ReferenceSource;
use crate::importer::normalize::{match_confidence, normalize_key};
use futures::future::join_all;
use std::collections::HashSet;
use tracing::{info, instrument, warn};

// ==========================================
// NameOptions - 下拉候选名称
// ==========================================
// 按归一化键去重，保留首次出现的写法与顺序
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameOptions(Vec<String>);

impl NameOptions {
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let options = names
            .into_iter()
            .filter_map(|name| {
                let name = name.as_ref().trim();
                let key = normalize_key(name);
                (!key.is_empty() && seen.insert(key)).then(|| name.to_string())
            })
            .collect();
        Self(options)
    }

    pub fn from_table<T: Named>(table: &ReferenceTable<T>) -> Self {
        Self::from_names(table.entries().iter().map(|e| e.name()))
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 未匹配名称的候选提示（按置信度降序，置信度为 0 的不返回）
    pub fn suggest(&self, query: &str, limit: usize) -> Vec<(&str, f64)> {
        let mut scored: Vec<(&str, f64)> = self
            .0
            .iter()
            .map(|name| (name.as_str(), match_confidence(query, name)))
            .filter(|(_, score)| *score > 0.0)
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(limit);
        scored
    }
}

// ==========================================
// ReferenceLoader - 参照数据加载器
// ==========================================
pub struct ReferenceLoader<'a, S: ReferenceSource + ?Sized> {
    source: &'a S,
}

impl<'a, S: ReferenceSource + ?Sized> ReferenceLoader<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self { source }
    }

    /// 加载全部参照数据
    ///
    /// # 流程
    /// 1. 并发拉取 couriers / sedes / categorias / almacenes
    /// 2. 按站点并发拉取商品与配送区域
    /// 3. 构建按站点的查找表与并集查找表
    ///
    /// # 返回
    /// 总是返回 ReferenceSets；失败信息记录在 `status` 中
    #[instrument(skip(self, session), fields(role = %session.role))]
    pub async fn load(&self, session: &Session) -> ReferenceSets {
        let mut refs = ReferenceSets::default();

        let (couriers, sedes, categorias, almacenes) = tokio::join!(
            self.source.fetch_couriers(session),
            self.source.fetch_sedes(session),
            self.source.fetch_categorias(session),
            self.source.fetch_almacenes(session),
        );

        if let Some(list) = settle(&mut refs, ReferenceKind::Couriers, couriers) {
            refs.couriers = ReferenceTable::from_entries(list);
        }
        if let Some(list) = settle(&mut refs, ReferenceKind::Categorias, categorias) {
            refs.categorias = ReferenceTable::from_entries(list);
        }
        if let Some(list) = settle(&mut refs, ReferenceKind::Almacenes, almacenes) {
            refs.almacenes = ReferenceTable::from_entries(list);
        }

        match settle(&mut refs, ReferenceKind::Sedes, sedes) {
            Some(list) => {
                self.load_per_sede(session, &list, &mut refs).await;
                refs.sedes = ReferenceTable::from_entries(list);
            }
            None => {
                // 没有站点列表就无法按站点拉取
                let reason = "sedes no disponibles".to_string();
                refs.status
                    .insert(ReferenceKind::Productos, SourceStatus::Failed(reason.clone()));
                refs.status
                    .insert(ReferenceKind::Zonas, SourceStatus::Failed(reason));
            }
        }

        info!(
            couriers = refs.couriers.len(),
            sedes = refs.sedes.len(),
            categorias = refs.categorias.len(),
            almacenes = refs.almacenes.len(),
            productos = refs.productos.len(),
            zonas = refs.zonas.len(),
            failed = refs.failed_sources().len(),
            "参照数据加载完成"
        );
        refs
    }

    async fn load_per_sede(&self, session: &Session, sedes: &[Sede], refs: &mut ReferenceSets) {
        let tasks = sedes.iter().map(|sede| async move {
            let (productos, zonas) = tokio::join!(
                self.source.fetch_productos(session, sede.id),
                self.source.fetch_zonas(session, sede.id),
            );
            (sede.id, productos, zonas)
        });
        let results = join_all(tasks).await;

        let mut productos_error: Option<String> = None;
        let mut zonas_error: Option<String> = None;
        let mut all_productos: Vec<Producto> = Vec::new();
        let mut all_zonas: Vec<Zona> = Vec::new();

        for (sede_id, productos, zonas) in results {
            match productos {
                Ok(list) => {
                    all_productos.extend(list.iter().cloned());
                    refs.productos_por_sede
                        .insert(sede_id, ReferenceTable::from_entries(list));
                }
                Err(e) => {
                    warn!(sede_id, error = %e, "站点商品加载失败");
                    productos_error.get_or_insert_with(|| e.user_message());
                }
            }
            match zonas {
                Ok(list) => {
                    all_zonas.extend(list.iter().cloned());
                    refs.zonas_por_sede
                        .insert(sede_id, ReferenceTable::from_entries(list));
                }
                Err(e) => {
                    warn!(sede_id, error = %e, "站点配送区域加载失败");
                    zonas_error.get_or_insert_with(|| e.user_message());
                }
            }
        }

        refs.productos = ReferenceTable::from_entries(all_productos);
        refs.zonas = ReferenceTable::from_entries(all_zonas);
        refs.status.insert(ReferenceKind::Productos, status_from(productos_error));
        refs.status.insert(ReferenceKind::Zonas, status_from(zonas_error));
    }
}

/// 记录数据源状态，成功时返回数据
fn settle<T>(refs: &mut ReferenceSets, kind: ReferenceKind, result: ApiResult<Vec<T>>) -> Option<Vec<T>> {
    match result {
        Ok(list) => {
            refs.status.insert(kind, SourceStatus::Loaded);
            Some(list)
        }
        Err(e) => {
            warn!(source = %kind, error = %e, "参照数据源加载失败，退化为空表");
            refs.status.insert(kind, SourceStatus::Failed(e.user_message()));
            None
        }
    }
}

fn status_from(error: Option<String>) -> SourceStatus {
    match error {
        Some(msg) => SourceStatus::Failed(msg),
        None => SourceStatus::Loaded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::reference::Categoria;

    #[test]
    fn test_name_options_dedupe_keeps_first_casing() {
        let opts = NameOptions::from_names(["Miraflores", "MIRAFLORES", " Surco ", "", "miraflóres"]);
        assert_eq!(opts.as_slice(), &["Miraflores".to_string(), "Surco".to_string()]);
    }

    #[test]
    fn test_name_options_from_table() {
        let table = ReferenceTable::from_entries(vec![
            Categoria { id: 1, nombre: "Ropa".to_string() },
            Categoria { id: 2, nombre: "Calzado".to_string() },
        ]);
        assert_eq!(NameOptions::from_table(&table).len(), 2);
    }

    #[test]
    fn test_suggest_orders_by_confidence() {
        let opts = NameOptions::from_names(["San Juan de Lurigancho", "San Borja", "Lince"]);
        let hits = opts.suggest("san juan", 5);
        assert_eq!(hits[0].0, "San Juan de Lurigancho");
        assert!(hits.iter().all(|(name, _)| *name != "Lince"));
    }
}
