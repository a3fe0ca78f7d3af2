// Anime Provider Traits
//
// Core interface every upstream adapter implements

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::ProviderError;
use crate::models::{
    AnimeInfo, AnimeSummary, Category, Episode, EpisodeRef, ProviderKind, ServerCandidate,
    SourceBundle,
};

/// Player page a client can iframe when no direct stream resolves
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedLink {
    #[serde(rename = "embedURL")]
    pub url: String,
    pub server: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_id: Option<String>,
}

/// Anime provider trait
///
/// Translates one upstream's native shapes into the normalized schema.
/// Catalogue methods never fail outward: upstream failures are logged and
/// reported as `[]` or `None`. `get_sources` returns its error so the
/// resolver can record it per attempt; it still must never panic.
#[async_trait]
pub trait AnimeProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Search by title; `[]` when nothing matches or the upstream fails.
    async fn search(&self, query: &str) -> Vec<AnimeSummary>;

    /// `None` means "not found at this provider".
    async fn get_info(&self, anime_id: &str) -> Option<AnimeInfo>;

    /// Episodes of `anime_id`, with links belonging to other shows removed.
    async fn list_episodes(&self, anime_id: &str) -> Vec<Episode>;

    async fn get_servers(&self, episode: &EpisodeRef) -> Vec<ServerCandidate>;

    /// Streams for one episode on one server. `Ok(None)` and an empty
    /// bundle both mean "nothing here".
    async fn get_sources(
        &self,
        episode: &EpisodeRef,
        server: &str,
        category: Category,
    ) -> Result<Option<SourceBundle>, ProviderError>;

    /// Embeddable player page, for providers that have one.
    async fn get_embed(
        &self,
        _episode: &EpisodeRef,
        _server: &str,
        _category: Category,
    ) -> Result<Option<EmbedLink>, ProviderError> {
        Ok(None)
    }
}

/// Collapse a fallible catalogue call into the non-throwing contract,
/// logging the failure.
pub fn or_logged<T: Default>(
    result: Result<T, ProviderError>,
    provider: ProviderKind,
    operation: &'static str,
) -> T {
    match result {
        Ok(value) => value,
        Err(ProviderError::NotFound(detail)) => {
            tracing::debug!(provider = %provider, operation, detail = %detail, "Not found at provider");
            T::default()
        }
        Err(e) => {
            tracing::warn!(provider = %provider, operation, error = %e, "Provider call failed");
            T::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_or_logged_defaults_on_error() {
        let failed: Result<Vec<u32>, ProviderError> =
            Err(ProviderError::UpstreamUnavailable("down".into()));
        assert!(or_logged(failed, ProviderKind::Zoro, "search").is_empty());

        let missing: Result<Option<u32>, ProviderError> = Err(ProviderError::NotFound("x".into()));
        assert_eq!(or_logged(missing, ProviderKind::Zoro, "get_info"), None);

        assert_eq!(or_logged(Ok(vec![1]), ProviderKind::Zoro, "search"), vec![1]);
    }

    #[test]
    fn test_embed_link_json_shape() {
        let link = EmbedLink {
            url: "https://megacloud.example/embed-2/e-1/abc".into(),
            server: "hd-1".into(),
            server_id: Some("641".into()),
        };
        let json = serde_json::to_value(&link).unwrap();
        assert_eq!(json["embedURL"], "https://megacloud.example/embed-2/e-1/abc");
        assert_eq!(json["serverId"], "641");
    }
}
