// ==========================================
// TIKTUY 批量导入 - 参照数据模型
// ==========================================
// 用途: 校验与补全预览行所需的只读查找表
// 生命周期: 每次预览会话加载一次
// 键: 归一化名称（大小写/变音符号不敏感）
// ==========================================

use crate::importer::normalize::normalize_key;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// ==========================================
// 参照实体（后端原始对象）
// ==========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Courier {
    pub id: i64,
    #[serde(alias = "nombre_comercial")]
    pub nombre: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sede {
    pub id: i64,
    pub nombre: String,
    #[serde(default)]
    pub courier_id: Option<i64>,
    #[serde(default)]
    pub ciudad: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Producto {
    pub id: i64,
    #[serde(alias = "nombre_producto")]
    pub nombre: String,
    #[serde(default)]
    pub precio: f64,
    #[serde(default)]
    pub stock: Option<f64>,
    #[serde(default)]
    pub sede_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zona {
    pub id: i64,
    pub distrito: String,
    #[serde(default)]
    pub tarifa: f64,
    #[serde(default)]
    pub sede_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Categoria {
    pub id: i64,
    pub nombre: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Almacen {
    pub id: i64,
    #[serde(alias = "nombre_almacen")]
    pub nombre: String,
}

/// 可按名称查找的参照实体
pub trait Named {
    fn id(&self) -> i64;
    fn name(&self) -> &str;
}

macro_rules! impl_named {
    ($ty:ty, $field:ident) => {
        impl Named for $ty {
            fn id(&self) -> i64 {
                self.id
            }
            fn name(&self) -> &str {
                &self.$field
            }
        }
    };
}

impl_named!(Courier, nombre);
impl_named!(Sede, nombre);
impl_named!(Producto, nombre);
impl_named!(Zona, distrito);
impl_named!(Categoria, nombre);
impl_named!(Almacen, nombre);

// ==========================================
// ReferenceKind / SourceStatus - 数据源状态
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    Couriers,
    Sedes,
    Categorias,
    Almacenes,
    Productos,
    Zonas,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReferenceKind::Couriers => "couriers",
            ReferenceKind::Sedes => "sedes",
            ReferenceKind::Categorias => "categorias",
            ReferenceKind::Almacenes => "almacenes",
            ReferenceKind::Productos => "productos",
            ReferenceKind::Zonas => "zonas",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum SourceStatus {
    NotLoaded,
    Loaded,
    Failed(String), // 加载失败: 该表退化为空表，不阻塞其他数据源
}

// ==========================================
// ReferenceTable - 名称索引查找表
// ==========================================
// 重复名称以首次出现为准
#[derive(Debug, Clone)]
pub struct ReferenceTable<T> {
    entries: Vec<T>,
    index: HashMap<String, usize>,
}

impl<T> Default for ReferenceTable<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<T: Named> ReferenceTable<T> {
    pub fn from_entries(entries: Vec<T>) -> Self {
        let mut table = Self::default();
        for entry in entries {
            table.push(entry);
        }
        table
    }

    pub fn push(&mut self, entry: T) {
        let key = normalize_key(entry.name());
        if key.is_empty() {
            return;
        }
        if !self.index.contains_key(&key) {
            self.index.insert(key, self.entries.len());
            self.entries.push(entry);
        }
    }

    pub fn find(&self, name: &str) -> Option<&T> {
        self.index
            .get(&normalize_key(name))
            .and_then(|&idx| self.entries.get(idx))
    }

    pub fn get_by_id(&self, id: i64) -> Option<&T> {
        self.entries.iter().find(|e| e.id() == id)
    }

    pub fn entries(&self) -> &[T] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ==========================================
// ReferenceSets - 一次预览会话的全部参照数据
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct ReferenceSets {
    pub couriers: ReferenceTable<Courier>,
    pub sedes: ReferenceTable<Sede>,
    pub categorias: ReferenceTable<Categoria>,
    pub almacenes: ReferenceTable<Almacen>,

    // 按站点划分（同名商品在不同站点对应不同记录）
    pub productos_por_sede: HashMap<i64, ReferenceTable<Producto>>,
    pub zonas_por_sede: HashMap<i64, ReferenceTable<Zona>>,

    // 全部站点并集（站点未解析时使用）
    pub productos: ReferenceTable<Producto>,
    pub zonas: ReferenceTable<Zona>,

    pub status: HashMap<ReferenceKind, SourceStatus>,
}

impl ReferenceSets {
    pub fn status_of(&self, kind: ReferenceKind) -> SourceStatus {
        self.status
            .get(&kind)
            .cloned()
            .unwrap_or(SourceStatus::NotLoaded)
    }

    /// 失败的数据源列表
    pub fn failed_sources(&self) -> Vec<(ReferenceKind, String)> {
        let mut failed: Vec<_> = self
            .status
            .iter()
            .filter_map(|(k, s)| match s {
                SourceStatus::Failed(msg) => Some((*k, msg.clone())),
                _ => None,
            })
            .collect();
        failed.sort_by_key(|(k, _)| k.to_string());
        failed
    }

    pub fn find_sede(&self, name: &str) -> Option<&Sede> {
        self.sedes.find(name)
    }

    pub fn find_courier(&self, name: &str) -> Option<&Courier> {
        self.couriers.find(name)
    }

    pub fn find_categoria(&self, name: &str) -> Option<&Categoria> {
        self.categorias.find(name)
    }

    pub fn find_almacen(&self, name: &str) -> Option<&Almacen> {
        self.almacenes.find(name)
    }

    /// 查找商品
    ///
    /// # 参数
    /// - sede_id: 已解析的站点；None 时在全部站点并集中查找
    /// - name: 商品名称
    ///
    /// 并集按名称去重，只能用于判断名称是否存在；ID / 库存 / 价格
    /// 必须取自 `find_producto_in_sede`
    pub fn find_producto(&self, sede_id: Option<i64>, name: &str) -> Option<&Producto> {
        match sede_id {
            Some(id) => self.find_producto_in_sede(id, name),
            None => self.productos.find(name),
        }
    }

    /// 站点内的商品记录
    pub fn find_producto_in_sede(&self, sede_id: i64, name: &str) -> Option<&Producto> {
        self.productos_por_sede
            .get(&sede_id)
            .and_then(|t| t.find(name))
    }

    /// 查找配送区域（按站点，站点未解析时使用并集）
    pub fn find_zona(&self, sede_id: Option<i64>, distrito: &str) -> Option<&Zona> {
        match sede_id {
            Some(id) => self.zonas_por_sede.get(&id).and_then(|t| t.find(distrito)),
            None => self.zonas.find(distrito),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn producto(id: i64, nombre: &str, precio: f64, sede_id: i64) -> Producto {
        Producto {
            id,
            nombre: nombre.to_string(),
            precio,
            stock: Some(10.0),
            sede_id: Some(sede_id),
        }
    }

    #[test]
    fn test_table_keeps_first_seen() {
        let table = ReferenceTable::from_entries(vec![
            Categoria { id: 1, nombre: "Ropa".to_string() },
            Categoria { id: 2, nombre: "ROPA ".to_string() },
            Categoria { id: 3, nombre: "  ".to_string() },
        ]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.find("ropa").map(|c| c.id), Some(1));
    }

    #[test]
    fn test_find_producto_scoped_by_sede() {
        let mut refs = ReferenceSets::default();
        refs.productos_por_sede.insert(
            1,
            ReferenceTable::from_entries(vec![producto(10, "Polo", 20.0, 1)]),
        );
        refs.productos_por_sede.insert(
            2,
            ReferenceTable::from_entries(vec![producto(20, "Polo", 25.0, 2)]),
        );

        assert_eq!(refs.find_producto(Some(1), "polo").map(|p| p.id), Some(10));
        assert_eq!(refs.find_producto(Some(2), "POLO").map(|p| p.id), Some(20));
        assert!(refs.find_producto(Some(3), "Polo").is_none());
    }

    #[test]
    fn test_status_defaults_to_not_loaded() {
        let refs = ReferenceSets::default();
        assert_eq!(refs.status_of(ReferenceKind::Zonas), SourceStatus::NotLoaded);
        assert!(refs.failed_sources().is_empty());
    }
}
