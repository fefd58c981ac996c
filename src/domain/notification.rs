// ==========================================
// TIKTUY - 通知领域模型
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub titulo: String,
    #[serde(default)]
    pub mensaje: String,
    #[serde(default)]
    pub leido: bool,
    pub created_at: DateTime<Utc>,
}
