//! Gogoanime scrape adapter

use anistream_media_providers::gogoanime::types::{GogoCategoryPage, GogoEmbedLink};
use anistream_media_providers::GogoanimeClient;
use async_trait::async_trait;

use super::normalize::{ids_match, lookup_with_id_fallback, title_query_from_slug};
use super::{or_logged, AnimeProvider, EmbedLink, ProviderError};
use crate::extractor::ExtractorSet;
use crate::models::{
    AnimeInfo, AnimeSummary, Category, Episode, EpisodeRef, ProviderKind, ServerCandidate,
    SourceBundle,
};

const DUB_SUFFIX: &str = "-dub";

pub struct GogoanimeProvider {
    client: GogoanimeClient,
    extractors: ExtractorSet,
}

impl GogoanimeProvider {
    #[must_use]
    pub const fn new(client: GogoanimeClient, extractors: ExtractorSet) -> Self {
        Self { client, extractors }
    }

    async fn discover_id(&self, anime_id: &str) -> Option<String> {
        let found = self.client.search(&title_query_from_slug(anime_id)).await.ok()?;
        found
            .into_iter()
            .map(|item| item.id)
            .find(|id| id != anime_id && ids_match(id, anime_id))
    }

    async fn category(&self, anime_id: &str) -> Result<GogoCategoryPage, ProviderError> {
        let (_, page) = lookup_with_id_fallback(
            anime_id,
            |id| async move { self.client.category(&id).await.map_err(ProviderError::from) },
            || self.discover_id(anime_id),
        )
        .await?;
        Ok(page)
    }

    /// Every embed on the episode page.
    async fn embeds(&self, slug: &str, episode_number: u32) -> Result<Vec<GogoEmbedLink>, ProviderError> {
        let (_, embeds) = lookup_with_id_fallback(
            slug,
            |id| async move {
                let embeds = self.client.episode_embeds(&id, episode_number).await?;
                if embeds.is_empty() {
                    return Err(ProviderError::NotFound(format!("{id}-episode-{episode_number}")));
                }
                Ok(embeds)
            },
            || self.discover_id(slug),
        )
        .await?;
        Ok(embeds)
    }

    /// Embeds of `server` only; other servers are separate candidates.
    async fn embeds_of(
        &self,
        slug: &str,
        episode_number: u32,
        server: &str,
    ) -> Result<Vec<GogoEmbedLink>, ProviderError> {
        Ok(self
            .embeds(slug, episode_number)
            .await?
            .into_iter()
            .filter(|e| e.server.eq_ignore_ascii_case(server))
            .collect())
    }
}

/// Site slug carrying `category`; dubs are separate titles. `None` for raw,
/// which the site does not offer.
fn slug_for(anime_id: &str, category: Category) -> Option<String> {
    match category {
        Category::Sub => Some(anime_id.to_string()),
        Category::Dub if anime_id.ends_with(DUB_SUFFIX) => Some(anime_id.to_string()),
        Category::Dub => Some(format!("{anime_id}{DUB_SUFFIX}")),
        Category::Raw => None,
    }
}

#[async_trait]
impl AnimeProvider for GogoanimeProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::GoGoAnime
    }

    async fn search(&self, query: &str) -> Vec<AnimeSummary> {
        let result = self.client.search(query).await.map_err(ProviderError::from);
        or_logged(result, self.kind(), "search")
            .into_iter()
            .map(|item| AnimeSummary {
                id: item.id,
                title: item.title,
                poster: item.poster,
                provider: ProviderKind::GoGoAnime,
            })
            .collect()
    }

    async fn get_info(&self, anime_id: &str) -> Option<AnimeInfo> {
        let result = self.category(anime_id).await.map(|page| {
            Some(AnimeInfo {
                id: page.id,
                title: page.title,
                poster: page.poster,
                description: page.description,
                total_episodes: page.ep_end,
                provider: ProviderKind::GoGoAnime,
            })
        });
        or_logged(result, self.kind(), "get_info")
    }

    async fn list_episodes(&self, anime_id: &str) -> Vec<Episode> {
        let result = async {
            let page = self.category(anime_id).await?;
            let movie_id = page.movie_id.ok_or_else(|| {
                ProviderError::ExtractionFailure(format!("no movie id on category page {}", page.id))
            })?;
            let alias = page.alias.unwrap_or_else(|| page.id.clone());
            let links = self
                .client
                .episode_list(&movie_id, &alias, page.ep_end.unwrap_or(0))
                .await?;
            Ok::<_, ProviderError>(links)
        }
        .await;

        or_logged(result, self.kind(), "list_episodes")
            .into_iter()
            .filter(|link| ids_match(&link.anime_slug, anime_id))
            .map(|link| Episode {
                number: link.number,
                id: format!("{anime_id}?ep={}", link.number),
                title: None,
                is_filler: false,
                upstream_id: link.href,
            })
            .collect()
    }

    async fn get_servers(&self, episode: &EpisodeRef) -> Vec<ServerCandidate> {
        let result = self
            .embeds(episode.anime_id(), episode.episode_number())
            .await;
        let mut candidates: Vec<ServerCandidate> = Vec::new();
        for embed in or_logged(result, self.kind(), "get_servers") {
            if !candidates.iter().any(|c| c.name == embed.server) {
                let priority = i32::try_from(candidates.len()).unwrap_or(i32::MAX);
                candidates.push(ServerCandidate::new(embed.server, ProviderKind::GoGoAnime, priority));
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
        let Some(slug) = slug_for(episode.anime_id(), category) else {
            return Ok(None);
        };
        let urls: Vec<String> = self
            .embeds_of(&slug, episode.episode_number(), server)
            .await?
            .into_iter()
            .map(|e| e.url)
            .collect();

        Ok(self
            .extractors
            .extract_with_fallback(&urls)
            .await
            .map(|bundle| bundle.labelled(server)))
    }

    async fn get_embed(
        &self,
        episode: &EpisodeRef,
        server: &str,
        category: Category,
    ) -> Result<Option<EmbedLink>, ProviderError> {
        let Some(slug) = slug_for(episode.anime_id(), category) else {
            return Ok(None);
        };
        Ok(self
            .embeds_of(&slug, episode.episode_number(), server)
            .await?
            .into_iter()
            .next()
            .map(|e| EmbedLink {
                url: e.url,
                server: e.server,
                server_id: None,
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::Extractor;
    use crate::models::Source;
    use std::sync::Arc;
    use std::time::Duration;
    use url::Url;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct EchoExtractor;

    #[async_trait]
    impl Extractor for EchoExtractor {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn matches(&self, url: &Url) -> bool {
            url.path().contains("streaming.php")
        }

        async fn try_extract(&self, embed_url: &Url) -> Result<SourceBundle, ProviderError> {
            let id = embed_url
                .query_pairs()
                .find(|(k, _)| k == "id")
                .map(|(_, v)| v.into_owned())
                .unwrap_or_default();
            Ok(SourceBundle {
                sources: vec![Source::new(format!("https://cdn.example/{id}.m3u8"), "echo")],
                ..SourceBundle::default()
            })
        }
    }

    fn provider(site: &MockServer, ajax: &MockServer) -> GogoanimeProvider {
        GogoanimeProvider::new(
            GogoanimeClient::new(site.uri(), ajax.uri(), Duration::from_secs(5)).unwrap(),
            ExtractorSet::new(vec![Arc::new(EchoExtractor) as Arc<dyn Extractor>]),
        )
    }

    const EPISODE_PAGE: &str = r#"<div class="anime_muti_link"><ul>
        <li class="anime"><a data-video="//embtaku.example/streaming.php?id=dub1">Vidstreaming</a></li>
        <li class="doodstream"><a data-video="https://dood.example/e/xyz">Doodstream</a></li>
    </ul></div>"#;

    #[test]
    fn test_slug_for_category() {
        assert_eq!(slug_for("naruto", Category::Sub).as_deref(), Some("naruto"));
        assert_eq!(slug_for("naruto", Category::Dub).as_deref(), Some("naruto-dub"));
        assert_eq!(slug_for("naruto-dub", Category::Dub).as_deref(), Some("naruto-dub"));
        assert_eq!(slug_for("naruto", Category::Raw), None);
    }

    #[tokio::test]
    async fn test_get_sources_uses_dub_slug() {
        let site = MockServer::start().await;
        let ajax = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/naruto-dub-episode-3"))
            .respond_with(ResponseTemplate::new(200).set_body_string(EPISODE_PAGE))
            .expect(1)
            .mount(&site)
            .await;

        let ep = EpisodeRef::parse("naruto?ep=3").unwrap();
        let provider = provider(&site, &ajax);
        let bundle = provider
            .get_sources(&ep, "vidstreaming", Category::Dub)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(bundle.sources[0].url, "https://cdn.example/dub1.m3u8");
        assert_eq!(bundle.sources[0].server, "vidstreaming");
    }

    #[tokio::test]
    async fn test_get_sources_does_not_borrow_other_servers() {
        let site = MockServer::start().await;
        let ajax = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/naruto-dub-episode-3"))
            .respond_with(ResponseTemplate::new(200).set_body_string(EPISODE_PAGE))
            .mount(&site)
            .await;

        // doodstream has no extractor; the vidstreaming embed on the same
        // page must not be reported as doodstream's stream
        let ep = EpisodeRef::parse("naruto?ep=3").unwrap();
        let provider = provider(&site, &ajax);
        assert!(provider.get_sources(&ep, "doodstream", Category::Dub).await.unwrap().is_none());

        let embed = provider.get_embed(&ep, "doodstream", Category::Dub).await.unwrap().unwrap();
        assert_eq!(embed.url, "https://dood.example/e/xyz");
        assert!(provider.get_embed(&ep, "mp4upload", Category::Dub).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_episodes_filters_foreign_slugs() {
        let site = MockServer::start().await;
        let ajax = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/category/naruto"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"
                <div class="anime_info_body_bg"><h1>Naruto</h1></div>
                <ul id="episode_page"><li><a ep_start="0" ep_end="220">1-220</a></li></ul>
                <input id="movie_id" value="72"><input id="alias_anime" value="naruto">"#))
            .mount(&site)
            .await;
        Mock::given(method("GET"))
            .and(path("/ajax/load-list-episode"))
            .and(query_param("id", "72"))
            .and(query_param("ep_end", "220"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"<ul id="episode_related">
                <li><a href=" /naruto-episode-2">EP 2</a></li>
                <li><a href=" /naruto-episode-1">EP 1</a></li>
                <li><a href=" /boruto-episode-3">EP 3</a></li>
            </ul>"#))
            .mount(&ajax)
            .await;

        let episodes = provider(&site, &ajax).list_episodes("naruto").await;
        let numbers: Vec<u32> = episodes.iter().map(|e| e.number).collect();
        assert_eq!(numbers, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_raw_is_not_offered() {
        let site = MockServer::start().await;
        let ajax = MockServer::start().await;
        let ep = EpisodeRef::parse("naruto?ep=1").unwrap();
        assert!(provider(&site, &ajax)
            .get_sources(&ep, "vidstreaming", Category::Raw)
            .await
            .unwrap()
            .is_none());
    }
}
