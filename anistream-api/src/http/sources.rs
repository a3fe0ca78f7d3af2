//! Episode source endpoints
//!
//! `/sources` runs the resolver and answers with proxy-wrapped URLs,
//! `/servers` lists the candidates an episode can be tried on and `/embed`
//! returns an iframe-able player page for when no direct stream resolves.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use anistream_core::models::{Category, EpisodeRef, SourceBundle};
use anistream_core::{pick_default, ResolveRequest};
use anistream_proxy::wrap_bundle;
use serde::Deserialize;
use serde_json::json;

use crate::http::{AppError, AppResult, AppState};

pub fn create_sources_router() -> Router<AppState> {
    Router::new()
        .route("/sources", get(get_sources))
        .route("/servers", get(get_servers))
        .route("/embed", get(get_embed))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeQuery {
    pub episode_id: Option<String>,
    pub server: Option<String>,
    pub category: Option<String>,
    pub fallback: Option<String>,
}

impl EpisodeQuery {
    fn episode(&self) -> AppResult<EpisodeRef> {
        let raw = self
            .episode_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AppError::bad_request("episodeId is required"))?;
        Ok(EpisodeRef::parse(raw)?)
    }

    fn category(&self) -> AppResult<Category> {
        match self.category.as_deref().map(str::trim) {
            None | Some("") => Ok(Category::default()),
            Some(raw) => Ok(raw.parse()?),
        }
    }

    fn server(&self) -> Option<&str> {
        self.server.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    fn allow_fallback(&self) -> bool {
        self.fallback
            .as_deref()
            .is_some_and(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
    }
}

/// GET /sources?episodeId=<animeId>?ep=<n>&server=&category=&fallback=
pub async fn get_sources(State(state): State<AppState>, Query(query): Query<EpisodeQuery>) -> AppResult<Response> {
    let episode = query.episode()?;
    let category = query.category()?;

    let mut request = ResolveRequest::new(episode, category).with_fallback(query.allow_fallback());
    if let Some(server) = query.server() {
        request = request.with_server(server);
    }

    let resolution = state.resolver.resolve(&request).await;
    let tried_servers = resolution.tried_servers();

    let Some(bundle) = resolution.bundle.clone() else {
        let error = resolution
            .error()
            .unwrap_or_else(|| "No sources found".to_string());
        return Ok((
            StatusCode::NOT_FOUND,
            Json(json!({
                "success": false,
                "error": error,
                "data": { "sources": [] },
                "triedServers": tried_servers,
                "attempts": resolution.attempts,
            })),
        )
            .into_response());
    };

    let bundle = wrap_bundle(bundle, &state.public_base_url);
    let default_source = pick_default(&bundle.sources).cloned();
    Ok(Json(json!({
        "success": true,
        "data": bundle,
        "server": resolution.server,
        "triedServers": tried_servers,
        "defaultSource": default_source,
    }))
    .into_response())
}

/// GET /servers?episodeId=...
pub async fn get_servers(State(state): State<AppState>, Query(query): Query<EpisodeQuery>) -> AppResult<Json<serde_json::Value>> {
    let episode = query.episode()?;
    let category = query.category()?;

    let (servers, sources) = tokio::join!(
        state.resolver.servers(&episode),
        state.resolver.cached_sources(&episode, category),
    );
    let sources = wrap_bundle(
        SourceBundle {
            sources,
            ..SourceBundle::default()
        },
        &state.public_base_url,
    )
    .sources;

    Ok(Json(json!({
        "success": true,
        "data": {
            "servers": servers,
            "sources": sources,
        },
    })))
}

/// GET /embed?episodeId=...&server=...&category=...
pub async fn get_embed(State(state): State<AppState>, Query(query): Query<EpisodeQuery>) -> AppResult<Json<serde_json::Value>> {
    let episode = query.episode()?;
    let category = query.category()?;

    let link = state
        .resolver
        .embed(&episode, query.server(), category)
        .await
        .ok_or_else(|| AppError::not_found(format!("No embed available for {episode}")))?;

    Ok(Json(json!({
        "success": true,
        "embedURL": link.url,
        "server": link.server,
        "serverId": link.server_id,
    })))
}
