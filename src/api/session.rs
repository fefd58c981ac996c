// ==========================================
// TIKTUY - 会话
// ==========================================
// 职责: 携带 bearer 令牌与角色，显式传入每一次请求
// 令牌的获取与存储由外部认证模块负责
// ==========================================

use crate::domain::types::Role;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub role: Role,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub courier_id: Option<i64>, // courier 角色登录时对应的 courier
}

impl Session {
    pub fn new(token: impl Into<String>, role: Role) -> Self {
        Self {
            token: token.into(),
            role,
            user_id: None,
            courier_id: None,
        }
    }

    pub fn with_courier(mut self, courier_id: i64) -> Self {
        self.courier_id = Some(courier_id);
        self
    }

    pub fn has_token(&self) -> bool {
        !self.token.trim().is_empty()
    }
}

// 令牌不输出到日志
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"****")
            .field("role", &self.role)
            .field("user_id", &self.user_id)
            .field("courier_id", &self.courier_id)
            .finish()
    }
}
