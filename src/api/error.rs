// ==========================================
// TIKTUY 批量导入 - API 层错误类型
// ==========================================
// 职责: 把 HTTP/解码错误转换为可展示的错误
// 红线: 后端返回的错误消息必须原样透出，不做改写
// ==========================================

use thiserror::Error;

/// API 层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    /// 401/403: 令牌缺失或失效
    #[error("未授权: {0}")]
    Unauthorized(String),

    /// 后端业务错误（message 为后端原文）
    #[error("{message}")]
    Status { status: u16, message: String },

    #[error("网络请求失败: {0}")]
    Http(String),

    #[error("响应解析失败: {0}")]
    Decode(String),

    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Http(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err.to_string())
    }
}

impl ApiError {
    /// 面向用户的消息
    ///
    /// 后端错误返回原文；其他错误返回 Display
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Status { message, .. } => message.clone(),
            ApiError::Unauthorized(message) => message.clone(),
            other => other.to_string(),
        }
    }

    /// 从错误响应体中提取消息
    ///
    /// # 规则
    /// 1. JSON 且包含 message / mensaje / error 字段 → 该字段
    /// 2. 非空文本 → 原文
    /// 3. 否则 → "HTTP {status}"
    pub fn from_response_body(status: u16, body: &str) -> Self {
        let message = extract_backend_message(body).unwrap_or_else(|| format!("HTTP {}", status));
        match status {
            401 | 403 => ApiError::Unauthorized(message),
            _ => ApiError::Status { status, message },
        }
    }
}

fn extract_backend_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        for key in ["message", "mensaje", "error"] {
            if let Some(msg) = value.get(key).and_then(|v| v.as_str()) {
                if !msg.trim().is_empty() {
                    return Some(msg.to_string());
                }
            }
        }
    }

    Some(trimmed.to_string())
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
