//! Proxy error types
//!
//! Upstream HTTP failures are surfaced to the player as structured JSON
//! rather than an empty body, so a failed stream says why it failed.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Upstream bodies are echoed back at most this long
pub const MAX_ERROR_BODY: usize = 512;

const BLOCKED_HINT: &str =
    "Upstream answered 403 Forbidden; this is likely an anti-bot block (Referer or User-Agent rejected)";

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("Upstream returned {status}: {message}")]
    Upstream {
        status: u16,
        message: String,
        body: String,
    },

    #[error("Upstream blocked the request ({status})")]
    Blocked {
        status: u16,
        body: String,
        hint: &'static str,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Upstream timed out: {0}")]
    Timeout(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Playlist too large (over {limit} bytes)")]
    TooLarge { limit: usize },
}

impl ProxyError {
    /// Classify an upstream error response.
    #[must_use]
    pub fn from_status(status: u16, reason: &str, body: &str) -> Self {
        let body = truncate(body, MAX_ERROR_BODY);
        if status == 403 {
            Self::Blocked {
                status,
                body,
                hint: BLOCKED_HINT,
            }
        } else {
            Self::Upstream {
                status,
                message: reason.to_string(),
                body,
            }
        }
    }

    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Upstream { status, .. } => StatusCode::from_u16(*status)
                .ok()
                .filter(|s| s.is_client_error() || s.is_server_error())
                .unwrap_or(StatusCode::BAD_GATEWAY),
            Self::Blocked { .. } => StatusCode::FORBIDDEN,
            Self::Network(_) | Self::TooLarge { .. } => StatusCode::BAD_GATEWAY,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::InvalidUrl(_) => StatusCode::BAD_REQUEST,
        }
    }
}

fn truncate(body: &str, max: usize) -> String {
    if body.len() <= max {
        return body.to_string();
    }
    let mut end = max;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

impl From<reqwest::Error> for ProxyError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::Timeout(err.url().map(ToString::to_string).unwrap_or_default());
        }
        Self::Network(err.to_string())
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let mut payload = json!({
            "success": false,
            "error": self.to_string(),
            "status": status.as_u16(),
        });
        match &self {
            Self::Blocked { body, hint, .. } => {
                payload["hint"] = json!(hint);
                payload["body"] = json!(body);
            }
            Self::Upstream { body, .. } => {
                payload["body"] = json!(body);
            }
            _ => {}
        }
        (
            status,
            [(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")],
            Json(payload),
        )
            .into_response()
    }
}
