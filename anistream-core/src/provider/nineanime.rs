//! 9anime adapter
//!
//! 9anime ids (`naruto.xx8z`) live outside the shared slug space, so an
//! `anime_id` is resolved by title search like AnimePahe. Server links are
//! token-API embeds.

use anistream_media_providers::nineanime::types::{NineEpisode, NineServer};
use anistream_media_providers::NineAnimeClient;
use async_trait::async_trait;

use super::normalize::{ids_match, slugify, title_query_from_slug};
use super::{or_logged, AnimeProvider, EmbedLink, ProviderError};
use crate::extractor::ExtractorSet;
use crate::models::{
    AnimeInfo, AnimeSummary, Category, Episode, EpisodeRef, ProviderKind, ServerCandidate,
    SourceBundle,
};

pub struct NineAnimeProvider {
    client: NineAnimeClient,
    extractors: ExtractorSet,
}

impl NineAnimeProvider {
    #[must_use]
    pub const fn new(client: NineAnimeClient, extractors: ExtractorSet) -> Self {
        Self { client, extractors }
    }

    /// Site id whose title slugifies to `anime_id`.
    async fn resolve(&self, anime_id: &str) -> Result<String, ProviderError> {
        self.client
            .search(&title_query_from_slug(anime_id))
            .await?
            .into_iter()
            .find(|item| ids_match(&slugify(&item.title), anime_id))
            .map(|item| item.id)
            .ok_or_else(|| ProviderError::NotFound(format!("no 9anime title matches {anime_id}")))
    }

    async fn episodes_of(&self, anime_id: &str) -> Result<Vec<NineEpisode>, ProviderError> {
        let site_id = self.resolve(anime_id).await?;
        let page = self.client.watch_page(&site_id).await?;
        Ok(self.client.episodes(&page.data_id).await?)
    }

    async fn servers_of(&self, episode: &EpisodeRef) -> Result<Vec<NineServer>, ProviderError> {
        let target = self
            .episodes_of(episode.anime_id())
            .await?
            .into_iter()
            .find(|ep| ep.number == episode.episode_number())
            .ok_or_else(|| ProviderError::NotFound(format!("episode {episode}")))?;
        Ok(self.client.servers(&target.ids).await?)
    }

    /// Servers carrying `category` named `server`.
    async fn servers_named(
        &self,
        episode: &EpisodeRef,
        server: &str,
        category: Category,
    ) -> Result<Vec<NineServer>, ProviderError> {
        Ok(self
            .servers_of(episode)
            .await?
            .into_iter()
            .filter(|s| carries(&s.kind, category) && s.name.eq_ignore_ascii_case(server))
            .collect())
    }
}

/// Hard- and soft-subbed groups both count as sub.
fn carries(kind: &str, category: Category) -> bool {
    match category {
        Category::Sub => kind.eq_ignore_ascii_case("sub") || kind.eq_ignore_ascii_case("softsub"),
        other => kind.eq_ignore_ascii_case(other.as_str()),
    }
}

#[async_trait]
impl AnimeProvider for NineAnimeProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::NineAnime
    }

    async fn search(&self, query: &str) -> Vec<AnimeSummary> {
        let result = self.client.search(query).await.map_err(ProviderError::from);
        or_logged(result, self.kind(), "search")
            .into_iter()
            .map(|item| AnimeSummary {
                id: slugify(&item.title),
                title: item.title,
                poster: item.poster,
                provider: ProviderKind::NineAnime,
            })
            .collect()
    }

    async fn get_info(&self, anime_id: &str) -> Option<AnimeInfo> {
        let result = async {
            let site_id = self.resolve(anime_id).await?;
            let page = self.client.watch_page(&site_id).await?;
            Ok::<_, ProviderError>(Some(AnimeInfo {
                id: slugify(&page.title),
                title: page.title,
                poster: page.poster,
                description: page.description,
                total_episodes: None,
                provider: ProviderKind::NineAnime,
            }))
        }
        .await;
        or_logged(result, self.kind(), "get_info")
    }

    async fn list_episodes(&self, anime_id: &str) -> Vec<Episode> {
        or_logged(self.episodes_of(anime_id).await, self.kind(), "list_episodes")
            .into_iter()
            .map(|ep| Episode {
                number: ep.number,
                id: format!("{anime_id}?ep={}", ep.number),
                title: ep.title,
                is_filler: false,
                upstream_id: ep.ids,
            })
            .collect()
    }

    async fn get_servers(&self, episode: &EpisodeRef) -> Vec<ServerCandidate> {
        let mut candidates: Vec<ServerCandidate> = Vec::new();
        for server in or_logged(self.servers_of(episode).await, self.kind(), "get_servers") {
            if !candidates.iter().any(|c| c.name == server.name) {
                let priority = i32::try_from(candidates.len()).unwrap_or(i32::MAX);
                candidates.push(ServerCandidate::new(server.name, ProviderKind::NineAnime, priority));
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
            let link = match self.client.server_link(&item.link_id).await {
                Ok(link) => link,
                Err(e) => {
                    tracing::debug!(provider = "nineanime", server = %item.name, error = %e, "No embed link for server");
                    continue;
                }
            };
            if let Some(bundle) = self.extractors.extract_with_fallback(&[link.url]).await {
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
            if let Ok(link) = self.client.server_link(&item.link_id).await {
                return Ok(Some(EmbedLink {
                    url: link.url,
                    server: item.name,
                    server_id: Some(item.link_id),
                }));
            }
        }
        Ok(None)
    }
}
