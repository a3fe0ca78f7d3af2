//! Media proxy endpoints
//!
//! `/proxy` serves any upstream resource, classifying it on the way;
//! `/proxy/m3u8` always treats the target as a playlist. Both forward the
//! client's `Range` header and accept an optional `referer` override.

use axum::{
    extract::{Query, State},
    http::{header::RANGE, HeaderMap},
    routing::get,
    Router,
};
use anistream_proxy::{proxy_options_preflight, ProxyError, ProxyRequest, ProxyResponse};
use serde::Deserialize;

use crate::http::AppState;

pub fn create_proxy_router() -> Router<AppState> {
    Router::new()
        .route("/proxy", get(proxy).options(proxy_options_preflight))
        .route("/proxy/m3u8", get(proxy_playlist).options(proxy_options_preflight))
}

#[derive(Debug, Deserialize)]
pub struct ProxyQuery {
    pub url: Option<String>,
    pub referer: Option<String>,
}

/// GET /proxy?url=<encoded-url>[&referer=<encoded-referer>]
pub async fn proxy(
    State(state): State<AppState>,
    Query(query): Query<ProxyQuery>,
    headers: HeaderMap,
) -> Result<ProxyResponse, ProxyError> {
    forward(&state, &query, &headers, false).await
}

/// GET /proxy/m3u8?url=<encoded-url>&referer=<encoded-referer>
pub async fn proxy_playlist(
    State(state): State<AppState>,
    Query(query): Query<ProxyQuery>,
    headers: HeaderMap,
) -> Result<ProxyResponse, ProxyError> {
    forward(&state, &query, &headers, true).await
}

async fn forward(
    state: &AppState,
    query: &ProxyQuery,
    headers: &HeaderMap,
    expect_playlist: bool,
) -> Result<ProxyResponse, ProxyError> {
    let url = query
        .url
        .as_deref()
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| ProxyError::InvalidUrl("missing url parameter".to_string()))?;
    let range = headers.get(RANGE).and_then(|v| v.to_str().ok());
    let referer = query.referer.as_deref().filter(|r| !r.trim().is_empty());

    state
        .proxy
        .fetch(ProxyRequest {
            url,
            range,
            referer,
            expect_playlist,
        })
        .await
}
