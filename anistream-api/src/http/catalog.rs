// Catalogue HTTP endpoints: search, anime info and episode listing

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use anistream_core::models::ProviderKind;
use serde::Deserialize;
use serde_json::json;

use crate::http::{AppError, AppResult, AppState};

pub fn create_catalog_router() -> Router<AppState> {
    Router::new()
        .route("/search", get(search))
        .route("/info", get(info))
        .route("/episodes", get(episodes))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub provider: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimeQuery {
    pub anime_id: Option<String>,
    pub provider: Option<String>,
}

fn provider_kind(raw: Option<&str>) -> AppResult<Option<ProviderKind>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => Ok(Some(raw.parse()?)),
    }
}

fn anime_id(query: &AnimeQuery) -> AppResult<&str> {
    query
        .anime_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::bad_request("animeId is required"))
}

/// GET /search?q=<query>&provider=<kind>
pub async fn search(State(state): State<AppState>, Query(query): Query<SearchQuery>) -> AppResult<Json<serde_json::Value>> {
    let kind = provider_kind(query.provider.as_deref())?;
    let results = state
        .catalog
        .search(query.q.as_deref().unwrap_or_default(), kind)
        .await?;
    Ok(Json(json!({ "success": true, "data": results.as_slice() })))
}

/// GET /info?animeId=<id>&provider=<kind>
pub async fn info(State(state): State<AppState>, Query(query): Query<AnimeQuery>) -> AppResult<Json<serde_json::Value>> {
    let kind = provider_kind(query.provider.as_deref())?;
    let id = anime_id(&query)?;
    let info = state
        .catalog
        .info(id, kind)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Anime not found: {id}")))?;
    Ok(Json(json!({ "success": true, "data": info })))
}

/// GET /episodes?animeId=<id>&provider=<kind>
pub async fn episodes(State(state): State<AppState>, Query(query): Query<AnimeQuery>) -> AppResult<Json<serde_json::Value>> {
    let kind = provider_kind(query.provider.as_deref())?;
    let id = anime_id(&query)?;
    let episodes = state.catalog.episodes(id, kind).await?;
    Ok(Json(json!({ "success": true, "data": episodes })))
}
