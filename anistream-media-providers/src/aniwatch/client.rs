//! Aniwatch HTTP Client
//!
//! Pure HTTP client for the Aniwatch REST API. Different deployments nest
//! the payload under `data`, under `data.data`, or return it at the top
//! level; [`locate_payload`] hides that before deserializing.

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::types::{
    ApiAnime, ApiAnimeDetail, ApiEpisodesPayload, ApiInfoPayload, ApiSearchPayload,
    ApiServersPayload, ApiSourcesPayload,
};
use crate::error::{check_response, json_with_limit, ProviderClientError};
use crate::http::{build_client, join_url};

const API_PREFIX: &str = "api/v2/hianime";

/// Aniwatch HTTP Client
pub struct AniwatchClient {
    base_url: String,
    client: Client,
}

impl AniwatchClient {
    /// Create a client against `base_url` (e.g. `http://localhost:4000`).
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ProviderClientError> {
        Ok(Self {
            base_url: base_url.into(),
            client: build_client(timeout)?,
        })
    }

    /// Search the catalogue
    pub async fn search(&self, query: &str) -> Result<Vec<ApiAnime>, ProviderClientError> {
        let payload: ApiSearchPayload = self
            .get_payload("search", &[("q", query)], "animes")
            .await?;
        Ok(payload.animes)
    }

    /// Anime detail page
    pub async fn anime_info(&self, anime_id: &str) -> Result<ApiAnimeDetail, ProviderClientError> {
        let payload: ApiInfoPayload = self
            .get_payload(&format!("anime/{anime_id}"), &[], "anime")
            .await?;
        Ok(payload.anime.info)
    }

    /// Episode list for an anime
    pub async fn episodes(&self, anime_id: &str) -> Result<ApiEpisodesPayload, ProviderClientError> {
        self.get_payload(&format!("anime/{anime_id}/episodes"), &[], "episodes")
            .await
    }

    /// Servers offering an episode, grouped by category
    pub async fn servers(&self, episode_id: &str) -> Result<ApiServersPayload, ProviderClientError> {
        self.get_payload(
            "episode/servers",
            &[("animeEpisodeId", episode_id)],
            "sub",
        )
        .await
    }

    /// Direct stream sources for an episode on a server
    pub async fn sources(
        &self,
        episode_id: &str,
        server: &str,
        category: &str,
    ) -> Result<ApiSourcesPayload, ProviderClientError> {
        self.get_payload(
            "episode/sources",
            &[
                ("animeEpisodeId", episode_id),
                ("server", server),
                ("category", category),
            ],
            "sources",
        )
        .await
    }

    async fn get_payload<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        marker: &str,
    ) -> Result<T, ProviderClientError> {
        let url = join_url(&self.base_url, &format!("{API_PREFIX}/{path}"));
        tracing::debug!(url = %url, "Aniwatch request");

        let resp = check_response(self.client.get(&url).query(query).send().await?)?;
        let body: Value = json_with_limit(resp).await?;

        let payload = locate_payload(&body, marker).ok_or_else(|| {
            ProviderClientError::Parse(format!("No `{marker}` field in response from {url}"))
        })?;
        serde_json::from_value(payload.clone()).map_err(Into::into)
    }
}

/// Find the object that carries `marker`, looking at the top level, then
/// `data`, then `data.data`.
#[must_use]
pub fn locate_payload<'a>(body: &'a Value, marker: &str) -> Option<&'a Value> {
    let mut current = Some(body);
    for _ in 0..3 {
        let node = current?;
        if node.get(marker).is_some() {
            return Some(node);
        }
        current = node.get("data");
    }
    None
}
