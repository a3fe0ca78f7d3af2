//! Zoro-family scrape adapter
//!
//! Serves both the hianime site (`HtmlScrape`) and its zoro mirrors
//! (`Zoro`); only the client's base URL and the reported kind differ.
//! Server buttons resolve to token-API embeds, handed to the extractors.

use anistream_media_providers::zoro::client::{numeric_id, slug_from_href};
use anistream_media_providers::zoro::types::{ZoroEpisodeLink, ZoroServerItem};
use anistream_media_providers::ZoroClient;
use async_trait::async_trait;

use super::normalize::{ids_match, lookup_with_id_fallback, title_query_from_slug};
use super::{or_logged, AnimeProvider, EmbedLink, ProviderError};
use crate::extractor::ExtractorSet;
use crate::models::{
    AnimeInfo, AnimeSummary, Category, Episode, EpisodeRef, ProviderKind, ServerCandidate,
    SourceBundle,
};

pub struct ZoroProvider {
    kind: ProviderKind,
    client: ZoroClient,
    extractors: ExtractorSet,
}

impl ZoroProvider {
    #[must_use]
    pub const fn new(kind: ProviderKind, client: ZoroClient, extractors: ExtractorSet) -> Self {
        Self {
            kind,
            client,
            extractors,
        }
    }

    async fn discover_id(&self, anime_id: &str) -> Option<String> {
        let found = self.client.search(&title_query_from_slug(anime_id)).await.ok()?;
        found
            .into_iter()
            .map(|item| item.id)
            .find(|id| id != anime_id && numeric_id(id).is_some() && ids_match(id, anime_id))
    }

    async fn episode_links(&self, anime_id: &str) -> Result<Vec<ZoroEpisodeLink>, ProviderError> {
        let (_, links) = lookup_with_id_fallback(
            anime_id,
            |id| async move {
                let numeric = numeric_id(&id)
                    .ok_or_else(|| ProviderError::NotFound(format!("{id} carries no numeric id")))?;
                Ok::<_, ProviderError>(self.client.episode_list(numeric).await?)
            },
            || self.discover_id(anime_id),
        )
        .await?;

        Ok(links
            .into_iter()
            .filter(|link| ids_match(&slug_from_href(&link.href), anime_id))
            .collect())
    }

    async fn episode_link(&self, episode: &EpisodeRef) -> Result<ZoroEpisodeLink, ProviderError> {
        self.episode_links(episode.anime_id())
            .await?
            .into_iter()
            .find(|link| link.number == episode.episode_number())
            .ok_or_else(|| ProviderError::NotFound(format!("episode {episode}")))
    }

    /// Servers of `category` named `server`. Moving on to other servers is
    /// the resolver's call, not the adapter's.
    async fn servers_named(
        &self,
        episode: &EpisodeRef,
        server: &str,
        category: Category,
    ) -> Result<Vec<ZoroServerItem>, ProviderError> {
        let link = self.episode_link(episode).await?;
        Ok(self
            .client
            .servers(&link.episode_id)
            .await?
            .into_iter()
            .filter(|s| s.kind.eq_ignore_ascii_case(category.as_str()) && s.name.eq_ignore_ascii_case(server))
            .collect())
    }
}

#[async_trait]
impl AnimeProvider for ZoroProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn search(&self, query: &str) -> Vec<AnimeSummary> {
        let result = self.client.search(query).await.map_err(ProviderError::from);
        or_logged(result, self.kind, "search")
            .into_iter()
            .map(|item| AnimeSummary {
                id: item.id,
                title: item.title,
                poster: item.poster,
                provider: self.kind,
            })
            .collect()
    }

    async fn get_info(&self, anime_id: &str) -> Option<AnimeInfo> {
        let result = lookup_with_id_fallback(
            anime_id,
            |id| async move { self.client.anime_page(&id).await.map_err(ProviderError::from) },
            || self.discover_id(anime_id),
        )
        .await
        .map(|(_, page)| {
            Some(AnimeInfo {
                id: page.id,
                title: page.title,
                poster: page.poster,
                description: page.description,
                total_episodes: None,
                provider: self.kind,
            })
        });
        or_logged(result, self.kind, "get_info")
    }

    async fn list_episodes(&self, anime_id: &str) -> Vec<Episode> {
        or_logged(self.episode_links(anime_id).await, self.kind, "list_episodes")
            .into_iter()
            .map(|link| Episode {
                number: link.number,
                id: format!("{anime_id}?ep={}", link.number),
                title: link.title,
                is_filler: false,
                upstream_id: link.episode_id,
            })
            .collect()
    }

    async fn get_servers(&self, episode: &EpisodeRef) -> Vec<ServerCandidate> {
        let result = async {
            let link = self.episode_link(episode).await?;
            Ok::<_, ProviderError>(self.client.servers(&link.episode_id).await?)
        }
        .await;

        let mut candidates: Vec<ServerCandidate> = Vec::new();
        for item in or_logged(result, self.kind, "get_servers") {
            let name = item.name.to_ascii_lowercase();
            if !candidates.iter().any(|c| c.name == name) {
                let priority = i32::try_from(candidates.len()).unwrap_or(i32::MAX);
                candidates.push(ServerCandidate::new(name, self.kind, priority));
            }
        }
        candidates
    }

    async fn get_sources(
        &self,
        episode: &EpisodeRef,
        server: &str,
        category: Category,
    ) -> Result<Option<SourceBundle>, ProviderError> {
        for item in self.servers_named(episode, server, category).await? {
            let link = match self.client.source_link(&item.data_id).await {
                Ok(link) => link,
                Err(e) => {
                    tracing::debug!(provider = %self.kind, server = %item.name, error = %e, "No embed link for server");
                    continue;
                }
            };
            if let Some(bundle) = self.extractors.extract_with_fallback(&[link.link]).await {
                return Ok(Some(bundle.labelled(server)));
            }
        }
        Ok(None)
    }

    async fn get_embed(
        &self,
        episode: &EpisodeRef,
        server: &str,
        category: Category,
    ) -> Result<Option<EmbedLink>, ProviderError> {
        for item in self.servers_named(episode, server, category).await? {
            if let Ok(link) = self.client.source_link(&item.data_id).await {
                return Ok(Some(EmbedLink {
                    url: link.link,
                    server: item.name.to_ascii_lowercase(),
                    server_id: Some(item.data_id),
                }));
            }
        }
        Ok(None)
    }
}
