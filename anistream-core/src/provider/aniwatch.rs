//! Official-API adapter
//!
//! Calls `AniwatchClient` and maps its raw payloads onto the normalized
//! schema. Sources come back direct, so no extractor is involved.

use anistream_media_providers::aniwatch::types::{
    ApiAnime, ApiAnimeDetail, ApiEpisode, ApiServersPayload, ApiSourcesPayload,
};
use anistream_media_providers::AniwatchClient;
use async_trait::async_trait;

use super::normalize::{ids_match, lookup_with_id_fallback, title_query_from_slug};
use super::{or_logged, AnimeProvider, ProviderError};
use crate::models::{
    AnimeInfo, AnimeSummary, Category, Episode, EpisodeRef, ProviderKind, ServerCandidate, Source,
    SourceBundle, SubtitleTrack, TimeRange,
};

pub struct AniwatchProvider {
    client: AniwatchClient,
}

impl AniwatchProvider {
    #[must_use]
    pub const fn new(client: AniwatchClient) -> Self {
        Self { client }
    }

    /// Search for the id the upstream actually uses for `anime_id`.
    async fn discover_id(&self, anime_id: &str) -> Option<String> {
        let found = self.client.search(&title_query_from_slug(anime_id)).await.ok()?;
        found
            .into_iter()
            .map(|a| a.id)
            .find(|id| id != anime_id && ids_match(id, anime_id))
    }

    async fn episodes_of(&self, anime_id: &str) -> Result<Vec<ApiEpisode>, ProviderError> {
        let (_, payload) = lookup_with_id_fallback(
            anime_id,
            |id| async move { self.client.episodes(&id).await.map_err(ProviderError::from) },
            || self.discover_id(anime_id),
        )
        .await?;

        let (kept, dropped): (Vec<_>, Vec<_>) = payload
            .episodes
            .into_iter()
            .partition(|ep| ids_match(episode_anime_slug(&ep.episode_id), anime_id));
        if !dropped.is_empty() {
            tracing::debug!(anime_id, dropped = dropped.len(), "Discarded episodes of other shows");
        }
        Ok(kept)
    }

    /// Upstream episode id for `episode`.
    async fn upstream_episode_id(&self, episode: &EpisodeRef) -> Result<String, ProviderError> {
        self.episodes_of(episode.anime_id())
            .await?
            .into_iter()
            .find(|ep| ep.number == episode.episode_number())
            .map(|ep| ep.episode_id)
            .ok_or_else(|| ProviderError::NotFound(format!("episode {episode}")))
    }
}

fn episode_anime_slug(upstream_id: &str) -> &str {
    upstream_id.split('?').next().unwrap_or_default()
}

fn summary(anime: ApiAnime) -> AnimeSummary {
    AnimeSummary {
        id: anime.id,
        title: anime.name,
        poster: anime.poster,
        provider: ProviderKind::OfficialApi,
    }
}

fn info(detail: ApiAnimeDetail) -> AnimeInfo {
    let total_episodes = detail
        .stats
        .and_then(|s| s.episodes)
        .and_then(|e| e.sub.max(e.dub));
    AnimeInfo {
        id: detail.id,
        title: detail.name,
        poster: detail.poster,
        description: detail.description,
        total_episodes,
        provider: ProviderKind::OfficialApi,
    }
}

fn server_candidates(payload: ApiServersPayload) -> Vec<ServerCandidate> {
    let mut names: Vec<String> = Vec::new();
    for server in payload.sub.into_iter().chain(payload.dub).chain(payload.raw) {
        let name = server.server_name.trim().to_ascii_lowercase();
        if !name.is_empty() && !names.contains(&name) {
            names.push(name);
        }
    }
    names
        .into_iter()
        .enumerate()
        .map(|(i, name)| {
            ServerCandidate::new(name, ProviderKind::OfficialApi, i32::try_from(i).unwrap_or(i32::MAX))
        })
        .collect()
}

fn bundle(payload: ApiSourcesPayload, server: &str) -> SourceBundle {
    let sources = payload
        .sources
        .into_iter()
        .map(|s| {
            let hls = s.is_m3u8 || s.kind.as_deref() == Some("hls");
            let source = Source::new(s.url, server);
            let is_playlist = hls || source.is_playlist;
            source
                .with_quality(s.quality.unwrap_or_default())
                .with_playlist(is_playlist)
        })
        .collect();

    let tracks = payload
        .tracks
        .into_iter()
        .filter(|t| t.kind.as_deref().is_none_or(|k| k == "captions"))
        .filter(|t| t.lang.as_deref() != Some("thumbnails"))
        .map(|t| SubtitleTrack {
            url: t.url,
            lang: t.lang.unwrap_or_else(|| "Unknown".to_string()),
        })
        .collect();

    SourceBundle {
        sources,
        headers: payload.headers,
        tracks,
        intro: payload.intro.and_then(|r| TimeRange::new(r.start, r.end)),
        outro: payload.outro.and_then(|r| TimeRange::new(r.start, r.end)),
    }
}

#[async_trait]
impl AnimeProvider for AniwatchProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OfficialApi
    }

    async fn search(&self, query: &str) -> Vec<AnimeSummary> {
        let result = self.client.search(query).await.map_err(ProviderError::from);
        or_logged(result, self.kind(), "search")
            .into_iter()
            .map(summary)
            .collect()
    }

    async fn get_info(&self, anime_id: &str) -> Option<AnimeInfo> {
        let result = lookup_with_id_fallback(
            anime_id,
            |id| async move { self.client.anime_info(&id).await.map_err(ProviderError::from) },
            || self.discover_id(anime_id),
        )
        .await
        .map(|(_, detail)| Some(info(detail)));
        or_logged(result, self.kind(), "get_info")
    }

    async fn list_episodes(&self, anime_id: &str) -> Vec<Episode> {
        let episodes = or_logged(self.episodes_of(anime_id).await, self.kind(), "list_episodes");
        episodes
            .into_iter()
            .map(|ep| Episode {
                number: ep.number,
                id: format!("{anime_id}?ep={}", ep.number),
                title: ep.title,
                is_filler: ep.is_filler,
                upstream_id: ep.episode_id,
            })
            .collect()
    }

    async fn get_servers(&self, episode: &EpisodeRef) -> Vec<ServerCandidate> {
        let result = async {
            let upstream_id = self.upstream_episode_id(episode).await?;
            let payload = self.client.servers(&upstream_id).await?;
            Ok::<_, ProviderError>(server_candidates(payload))
        }
        .await;
        or_logged(result, self.kind(), "get_servers")
    }

    async fn get_sources(
        &self,
        episode: &EpisodeRef,
        server: &str,
        category: Category,
    ) -> Result<Option<SourceBundle>, ProviderError> {
        let upstream_id = self.upstream_episode_id(episode).await?;
        let payload = self
            .client
            .sources(&upstream_id, server, category.as_str())
            .await?;
        Ok(Some(bundle(payload, server)))
    }
}
