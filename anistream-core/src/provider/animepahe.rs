//! AnimePahe adapter
//!
//! AnimePahe keys everything by opaque sessions rather than slugs, so an
//! `anime_id` is resolved by title search. Each play page offers one kwik
//! embed per resolution and audio track.

use anistream_media_providers::animepahe::types::{PaheRelease, PaheSearchItem, PaheStreamButton};
use anistream_media_providers::AnimePaheClient;
use async_trait::async_trait;

use super::normalize::{ids_match, slugify, title_query_from_slug};
use super::{or_logged, AnimeProvider, EmbedLink, ProviderError};
use crate::extractor::ExtractorSet;
use crate::models::{
    AnimeInfo, AnimeSummary, Category, Episode, EpisodeRef, ProviderKind, ServerCandidate,
    SourceBundle,
};

/// Resolutions extracted per episode, best first
const MAX_STREAMS: usize = 3;

const SERVER_NAME: &str = "kwik";

pub struct AnimePaheProvider {
    client: AnimePaheClient,
    extractors: ExtractorSet,
}

impl AnimePaheProvider {
    #[must_use]
    pub const fn new(client: AnimePaheClient, extractors: ExtractorSet) -> Self {
        Self { client, extractors }
    }

    async fn resolve(&self, anime_id: &str) -> Result<PaheSearchItem, ProviderError> {
        self.client
            .search(&title_query_from_slug(anime_id))
            .await?
            .into_iter()
            .find(|item| ids_match(&slugify(&item.title), anime_id))
            .ok_or_else(|| ProviderError::NotFound(format!("no AnimePahe title matches {anime_id}")))
    }

    /// Releases numbered from 1, paired with that number.
    async fn releases(&self, anime_id: &str) -> Result<(PaheSearchItem, Vec<(u32, PaheRelease)>), ProviderError> {
        let anime = self.resolve(anime_id).await?;
        let releases = self.client.all_releases(&anime.session).await?;
        Ok((anime, renumber(releases)))
    }

    async fn buttons(&self, episode: &EpisodeRef) -> Result<Vec<PaheStreamButton>, ProviderError> {
        let (anime, releases) = self.releases(episode.anime_id()).await?;
        let release = releases
            .into_iter()
            .find(|(n, _)| *n == episode.episode_number())
            .map(|(_, r)| r)
            .ok_or_else(|| ProviderError::NotFound(format!("episode {episode}")))?;
        Ok(self.client.stream_buttons(&anime.session, &release.session).await?)
    }
}

/// Continuing seasons number episodes from where the previous one ended;
/// shift them so the first whole-numbered release is episode 1. Fractional
/// recap episodes are dropped.
fn renumber(releases: Vec<PaheRelease>) -> Vec<(u32, PaheRelease)> {
    let whole: Vec<(u32, PaheRelease)> = releases
        .into_iter()
        .filter(|r| r.episode.fract() == 0.0 && r.episode >= 1.0 && r.episode <= f64::from(u32::MAX))
        .map(|r| (r.episode as u32, r))
        .collect();
    let offset = whole.iter().map(|(n, _)| *n).min().map_or(0, |first| first - 1);
    whole.into_iter().map(|(n, r)| (n - offset, r)).collect()
}

/// Buttons carrying `category`'s audio, best resolution first.
fn pick_buttons(mut buttons: Vec<PaheStreamButton>, category: Category) -> Vec<PaheStreamButton> {
    let audio = match category {
        Category::Sub => "jpn",
        Category::Dub => "eng",
        Category::Raw => return Vec::new(),
    };
    buttons.retain(|b| b.audio.as_deref().map_or(category == Category::Sub, |a| a.eq_ignore_ascii_case(audio)));
    buttons.sort_by(|a, b| b.resolution.cmp(&a.resolution));
    buttons.truncate(MAX_STREAMS);
    buttons
}

#[async_trait]
impl AnimeProvider for AnimePaheProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::AnimePahe
    }

    async fn search(&self, query: &str) -> Vec<AnimeSummary> {
        let result = self.client.search(query).await.map_err(ProviderError::from);
        or_logged(result, self.kind(), "search")
            .into_iter()
            .map(|item| AnimeSummary {
                id: slugify(&item.title),
                title: item.title,
                poster: item.poster,
                provider: ProviderKind::AnimePahe,
            })
            .collect()
    }

    async fn get_info(&self, anime_id: &str) -> Option<AnimeInfo> {
        let result = self.resolve(anime_id).await.map(|item| {
            Some(AnimeInfo {
                id: slugify(&item.title),
                title: item.title,
                poster: item.poster,
                description: None,
                total_episodes: item.episodes,
                provider: ProviderKind::AnimePahe,
            })
        });
        or_logged(result, self.kind(), "get_info")
    }

    async fn list_episodes(&self, anime_id: &str) -> Vec<Episode> {
        let result = self.releases(anime_id).await.map(|(_, releases)| releases);
        or_logged(result, self.kind(), "list_episodes")
            .into_iter()
            .map(|(number, release)| Episode {
                number,
                id: format!("{anime_id}?ep={number}"),
                title: release.title,
                is_filler: release.filler != 0,
                upstream_id: release.session,
            })
            .collect()
    }

    async fn get_servers(&self, episode: &EpisodeRef) -> Vec<ServerCandidate> {
        let buttons = or_logged(self.buttons(episode).await, self.kind(), "get_servers");
        if buttons.is_empty() {
            return Vec::new();
        }
        vec![ServerCandidate::new(SERVER_NAME, ProviderKind::AnimePahe, 0)]
    }

    async fn get_sources(
        &self,
        episode: &EpisodeRef,
        server: &str,
        category: Category,
    ) -> Result<Option<SourceBundle>, ProviderError> {
        if category == Category::Raw {
            return Ok(None);
        }
        let buttons = pick_buttons(self.buttons(episode).await?, category);

        let mut combined = SourceBundle::default();
        for button in buttons {
            match self.extractors.extract(&button.embed_url).await {
                Ok(bundle) => {
                    if combined.headers.is_empty() {
                        combined.headers = bundle.headers;
                    }
                    let quality = button.resolution.map(|r| format!("{r}p")).unwrap_or_default();
                    combined.sources.extend(
                        bundle
                            .sources
                            .into_iter()
                            .map(|s| s.with_quality(quality.clone())),
                    );
                }
                Err(e) => {
                    tracing::debug!(provider = "animepahe", url = %button.embed_url, error = %e, "Stream button failed");
                }
            }
        }

        Ok((!combined.is_empty()).then(|| combined.labelled(server)))
    }

    async fn get_embed(
        &self,
        episode: &EpisodeRef,
        _server: &str,
        category: Category,
    ) -> Result<Option<EmbedLink>, ProviderError> {
        let buttons = pick_buttons(self.buttons(episode).await?, category);
        Ok(buttons.into_iter().next().map(|b| EmbedLink {
            url: b.embed_url,
            server: SERVER_NAME.to_string(),
            server_id: None,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::Extractor;
    use crate::models::Source;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use url::Url;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct Mp4Extractor;

    #[async_trait]
    impl Extractor for Mp4Extractor {
        fn name(&self) -> &'static str {
            "mp4"
        }

        fn matches(&self, _url: &Url) -> bool {
            true
        }

        async fn try_extract(&self, embed_url: &Url) -> Result<SourceBundle, ProviderError> {
            Ok(SourceBundle {
                sources: vec![Source::new(format!("https://files.example{}.mp4", embed_url.path()), "kwik")],
                ..SourceBundle::default()
            })
        }
    }

    fn release(episode: f64, session: &str) -> PaheRelease {
        serde_json::from_value(json!({"episode": episode, "session": session})).unwrap()
    }

    fn button(res: u32, audio: &str) -> PaheStreamButton {
        PaheStreamButton {
            embed_url: format!("https://kwik.example/e/{res}{audio}"),
            resolution: Some(res),
            audio: Some(audio.to_string()),
            fansub: None,
        }
    }

    #[test]
    fn test_renumber_shifts_continuing_seasons() {
        let numbered = renumber(vec![release(13.0, "a"), release(13.5, "recap"), release(14.0, "b")]);
        let numbers: Vec<u32> = numbered.iter().map(|(n, _)| *n).collect();
        assert_eq!(numbers, vec![1, 2]);
        assert_eq!(numbered[1].1.session, "b");
    }

    #[test]
    fn test_pick_buttons_by_audio_and_resolution() {
        let buttons = vec![button(360, "jpn"), button(1080, "jpn"), button(720, "eng"), button(720, "jpn"), button(480, "jpn")];
        let sub: Vec<Option<u32>> = pick_buttons(buttons.clone(), Category::Sub).iter().map(|b| b.resolution).collect();
        assert_eq!(sub, vec![Some(1080), Some(720), Some(480)]);
        let dub = pick_buttons(buttons.clone(), Category::Dub);
        assert_eq!(dub.len(), 1);
        assert!(pick_buttons(buttons, Category::Raw).is_empty());
    }

    #[tokio::test]
    async fn test_get_sources_resolves_by_title() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api"))
            .and(query_param("m", "search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [
                {"title": "Boruto: Naruto Next Generations", "session": "s-boruto"},
                {"title": "Naruto", "session": "s-naruto", "episodes": 220}
            ]})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api"))
            .and(query_param("m", "release"))
            .and(query_param("id", "s-naruto"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total": 2, "current_page": 1, "last_page": 1,
                "data": [{"episode": 1, "session": "e1"}, {"episode": 2, "session": "e2"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/play/s-naruto/e2"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"<div id="resolutionMenu">
                <button data-src="https://kwik.example/e/low" data-resolution="360" data-audio="jpn">360p</button>
                <button data-src="https://kwik.example/e/high" data-resolution="1080" data-audio="jpn">1080p</button>
            </div>"#))
            .mount(&server)
            .await;

        let provider = AnimePaheProvider::new(
            AnimePaheClient::new(server.uri(), Duration::from_secs(5)).unwrap(),
            ExtractorSet::new(vec![Arc::new(Mp4Extractor) as Arc<dyn Extractor>]),
        );
        let ep = EpisodeRef::parse("naruto-677?ep=2").unwrap();
        let bundle = provider.get_sources(&ep, "kwik", Category::Sub).await.unwrap().unwrap();

        assert_eq!(bundle.sources.len(), 2);
        assert_eq!(bundle.sources[0].url, "https://files.example/e/high.mp4");
        assert_eq!(bundle.sources[0].quality, "1080p");
        assert_eq!(bundle.sources[1].quality, "360p");
        assert!(bundle.sources.iter().all(|s| s.server == "kwik"));
    }
}
