// ==========================================
// TIKTUY 批量导入 - 配置管理器
// ==========================================
// 职责: 配置加载与多级覆写
// 优先级: 默认值 < 配置文件(JSON) < 环境变量
// ==========================================

use crate::config::import_rules::{ImportRules, ImportRulesReader};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

// ==========================================
// 配置键（环境变量）
// ==========================================
pub mod config_keys {
    pub const CONFIG_PATH: &str = "TIKTUY_CONFIG";
    pub const API_URL: &str = "TIKTUY_API_URL";
    pub const API_TIMEOUT_SECS: &str = "TIKTUY_API_TIMEOUT_SECS";
    pub const API_TOKEN: &str = "TIKTUY_API_TOKEN";
    pub const ROLE: &str = "TIKTUY_ROLE";
    pub const LOCALE: &str = "TIKTUY_LOCALE";
    pub const MAX_ROWS: &str = "TIKTUY_IMPORT_MAX_ROWS";
}

// ==========================================
// Endpoints - 后端接口路径
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub order_preview: String,
    pub order_commit: String,
    pub product_preview: String,
    pub product_commit: String,
    pub couriers: String,
    pub sedes: String,
    pub categorias: String,
    pub almacenes: String,
    /// `{id}` 替换为站点 ID
    pub productos_por_sede: String,
    /// `{id}` 替换为站点 ID
    pub zonas_por_sede: String,
    pub cuadre_validar: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            order_preview: "/pedidos/importacion/preview".to_string(),
            order_commit: "/pedidos/importacion".to_string(),
            product_preview: "/productos/importacion/preview".to_string(),
            product_commit: "/productos/importacion".to_string(),
            couriers: "/couriers".to_string(),
            sedes: "/sedes".to_string(),
            categorias: "/categorias".to_string(),
            almacenes: "/almacenes".to_string(),
            productos_por_sede: "/sedes/{id}/productos".to_string(),
            zonas_por_sede: "/sedes/{id}/zonas".to_string(),
            cuadre_validar: "/cuadre-saldo/validar".to_string(),
        }
    }
}

impl Endpoints {
    /// 替换路径中的 `{id}`
    pub fn with_id(template: &str, id: i64) -> String {
        template.replace("{id}", &id.to_string())
    }
}

// ==========================================
// ClientConfig - 客户端配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub locale: String,
    pub endpoints: Endpoints,
    pub import: ImportRules,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:4000/api".to_string(),
            timeout_secs: 30,
            locale: "es".to_string(),
            endpoints: Endpoints::default(),
            import: ImportRules::default(),
        }
    }
}

impl ImportRulesReader for ClientConfig {
    fn import_rules(&self) -> ImportRules {
        self.import.clone()
    }
}

// ==========================================
// ConfigManager - 配置加载
// ==========================================
pub struct ConfigManager;

impl ConfigManager {
    /// 默认配置文件路径: `<config_dir>/tiktuy/config.json`
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("tiktuy").join("config.json"))
    }

    /// 加载配置（默认值 → 配置文件 → 环境变量）
    ///
    /// # 说明
    /// - 配置文件不存在时使用默认值
    /// - 配置文件存在但格式错误时返回错误
    pub fn load() -> Result<ClientConfig, Box<dyn Error>> {
        let path = std::env::var(config_keys::CONFIG_PATH)
            .ok()
            .map(PathBuf::from)
            .or_else(Self::default_config_path);

        let mut config = match path {
            Some(p) if p.exists() => Self::load_file(&p)?,
            Some(p) => {
                debug!(path = %p.display(), "配置文件不存在，使用默认配置");
                ClientConfig::default()
            }
            None => ClientConfig::default(),
        };

        Self::apply_env(&mut config, |key| std::env::var(key).ok());
        info!(base_url = %config.base_url, locale = %config.locale, "配置加载完成");
        Ok(config)
    }

    /// 从 JSON 文件读取配置
    pub fn load_file(path: &Path) -> Result<ClientConfig, Box<dyn Error>> {
        let raw = std::fs::read_to_string(path)?;
        let config: ClientConfig = serde_json::from_str(&raw)?;
        info!(path = %path.display(), "已读取配置文件");
        Ok(config)
    }

    /// 环境变量覆写
    ///
    /// # 参数
    /// - lookup: 环境变量读取函数（测试时可替换）
    pub fn apply_env<F>(config: &mut ClientConfig, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(config_keys::API_URL).filter(|v| !v.trim().is_empty()) {
            config.base_url = url.trim().trim_end_matches('/').to_string();
        }

        if let Some(raw) = lookup(config_keys::API_TIMEOUT_SECS) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.timeout_secs = secs,
                _ => warn!(value = %raw, "超时配置无效，忽略"),
            }
        }

        if let Some(locale) = lookup(config_keys::LOCALE).filter(|v| !v.trim().is_empty()) {
            config.locale = locale.trim().to_string();
        }

        if let Some(raw) = lookup(config_keys::MAX_ROWS) {
            match raw.trim().parse::<usize>() {
                Ok(max) if max > 0 => config.import.max_rows = max,
                _ => warn!(value = %raw, "最大行数配置无效，忽略"),
            }
        }
    }
}
