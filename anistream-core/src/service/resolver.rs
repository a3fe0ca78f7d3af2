//! Source resolution service
//!
//! Walks the configured server candidates for one episode, strictly in
//! order, until a provider returns a non-empty bundle. Every attempt is
//! recorded so callers can report which servers were tried.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::cache::{sources_key, ResolutionCache};
use crate::config::ResolutionConfig;
use crate::models::{
    AttemptOutcome, Category, EpisodeRef, ResolutionAttempt, ServerCandidate, Source, SourceBundle,
};
use crate::provider::{EmbedLink, ProviderRegistry};
use crate::resilience::fallback::{first_success, Step, StepOutcome};

/// Server tried first when neither the request nor the config names one
const FALLBACK_DEFAULT_SERVER: &str = "hd-1";

/// One resolution request
#[derive(Debug, Clone)]
pub struct ResolveRequest {
    pub episode: EpisodeRef,
    /// Preferred server; `None` means the configured default
    pub server: Option<String>,
    pub category: Category,
    /// Ignore `server` and walk the plain priority order
    pub allow_fallback: bool,
}

impl ResolveRequest {
    #[must_use]
    pub const fn new(episode: EpisodeRef, category: Category) -> Self {
        Self {
            episode,
            server: None,
            category,
            allow_fallback: false,
        }
    }

    #[must_use]
    pub fn with_server(mut self, server: impl Into<String>) -> Self {
        self.server = Some(server.into());
        self
    }

    #[must_use]
    pub const fn with_fallback(mut self, allow_fallback: bool) -> Self {
        self.allow_fallback = allow_fallback;
        self
    }
}

/// Outcome of one resolution run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    /// `None` when every candidate came back empty or failed
    pub bundle: Option<SourceBundle>,
    /// Winning server
    pub server: Option<String>,
    pub attempts: Vec<ResolutionAttempt>,
}

impl Resolution {
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.bundle.is_none()
    }

    /// Names of every attempted server, in order, winner included
    #[must_use]
    pub fn tried_servers(&self) -> Vec<String> {
        self.attempts.iter().map(|a| a.server.clone()).collect()
    }

    /// Aggregate failure message for an exhausted run
    #[must_use]
    pub fn error(&self) -> Option<String> {
        if !self.is_exhausted() {
            return None;
        }
        let failed = self
            .attempts
            .iter()
            .filter(|a| a.outcome == AttemptOutcome::Error)
            .count();
        Some(format!(
            "No sources found after trying {} server(s) ({failed} failed)",
            self.attempts.len()
        ))
    }
}

/// Source resolver
///
/// Holds the provider registry and the candidate list; candidates whose
/// provider is not registered are never attempted.
#[derive(Clone)]
pub struct SourceResolver {
    registry: ProviderRegistry,
    candidates: Vec<ServerCandidate>,
    default_server: String,
    candidate_timeout: Option<Duration>,
    cache: Option<ResolutionCache>,
}

impl std::fmt::Debug for SourceResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceResolver")
            .field("candidates", &self.candidates)
            .field("default_server", &self.default_server)
            .finish_non_exhaustive()
    }
}

impl SourceResolver {
    #[must_use]
    pub fn new(registry: ProviderRegistry, mut candidates: Vec<ServerCandidate>) -> Self {
        candidates.sort_by_key(|c| c.priority);
        let default_server = candidates
            .first()
            .map_or_else(|| FALLBACK_DEFAULT_SERVER.to_string(), |c| c.name.clone());
        Self {
            registry,
            candidates,
            default_server,
            candidate_timeout: None,
            cache: None,
        }
    }

    /// Build from the `resolution` config section.
    #[must_use]
    pub fn from_config(registry: ProviderRegistry, config: &ResolutionConfig) -> Self {
        Self::new(registry, config.server_candidates())
            .with_default_server(&config.default_server)
            .with_candidate_timeout(config.candidate_timeout())
    }

    #[must_use]
    pub fn with_default_server(mut self, server: &str) -> Self {
        if !server.trim().is_empty() {
            self.default_server = server.trim().to_string();
        }
        self
    }

    #[must_use]
    pub const fn with_candidate_timeout(mut self, timeout: Duration) -> Self {
        self.candidate_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_cache(mut self, cache: Option<ResolutionCache>) -> Self {
        self.cache = cache;
        self
    }

    #[must_use]
    pub const fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Candidates in the order a run will try them.
    ///
    /// Without fallback the requested server (or the default) leads and the
    /// rest follow in priority order. A requested name matching no candidate
    /// is tried first against the top candidate's provider. With fallback
    /// the request is ignored.
    #[must_use]
    pub fn candidate_order(&self, requested: Option<&str>, allow_fallback: bool) -> Vec<ServerCandidate> {
        let available: Vec<ServerCandidate> = self
            .candidates
            .iter()
            .filter(|c| self.registry.contains(c.provider_kind))
            .cloned()
            .collect();
        if allow_fallback {
            return available;
        }

        let wanted = requested
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.default_server);

        let mut ordered = Vec::with_capacity(available.len() + 1);
        match available.iter().find(|c| c.name.eq_ignore_ascii_case(wanted)) {
            Some(candidate) => ordered.push(candidate.clone()),
            None => {
                if let Some(top) = available.first() {
                    ordered.push(ServerCandidate::new(wanted, top.provider_kind, i32::MIN));
                }
            }
        }
        ordered.extend(
            available
                .into_iter()
                .filter(|c| !c.name.eq_ignore_ascii_case(wanted)),
        );
        ordered
    }

    /// Resolve streams for one episode.
    ///
    /// Successful runs are served from the cache when one is configured.
    pub async fn resolve(&self, request: &ResolveRequest) -> Arc<Resolution> {
        let key = sources_key(
            &request.episode,
            request.server.as_deref(),
            request.category,
            request.allow_fallback,
        );
        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get_sources(&key).await {
                return hit;
            }
        }

        let resolution = Arc::new(self.run(request).await);
        if let Some(cache) = &self.cache {
            cache.insert_sources(key, Arc::clone(&resolution)).await;
        }
        resolution
    }

    async fn run(&self, request: &ResolveRequest) -> Resolution {
        let candidates = self.candidate_order(request.server.as_deref(), request.allow_fallback);
        let episode = &request.episode;
        let category = request.category;

        let run = first_success(candidates, self.candidate_timeout, |candidate: ServerCandidate| async move {
            let Some(provider) = self.registry.get(candidate.provider_kind) else {
                return Step::Failed(format!("provider {} is not registered", candidate.provider_kind));
            };
            match provider.get_sources(episode, candidate.upstream_name(), category).await {
                Ok(Some(bundle)) if !bundle.is_empty() => Step::Done(bundle.labelled(&candidate.name)),
                Ok(_) => Step::Empty,
                Err(e) => Step::Failed(e.to_string()),
            }
        })
        .await;

        let attempts: Vec<ResolutionAttempt> = run
            .trail
            .iter()
            .map(|(candidate, outcome)| {
                let (outcome, error_detail) = match outcome {
                    StepOutcome::Success => (AttemptOutcome::Success, None),
                    StepOutcome::Empty => (AttemptOutcome::EmptyResult, None),
                    StepOutcome::Failed(detail) => {
                        tracing::warn!(
                            episode = %episode,
                            server = %candidate.name,
                            provider = %candidate.provider_kind,
                            error = %detail,
                            "Server candidate failed"
                        );
                        (AttemptOutcome::Error, Some(detail.clone()))
                    }
                };
                ResolutionAttempt {
                    server: candidate.name.clone(),
                    outcome,
                    error_detail,
                }
            })
            .collect();

        match run.winner {
            Some((candidate, bundle)) => {
                tracing::info!(
                    episode = %episode,
                    server = %candidate.name,
                    provider = %candidate.provider_kind,
                    sources = bundle.sources.len(),
                    attempt = attempts.len(),
                    "Resolved sources"
                );
                Resolution {
                    bundle: Some(bundle),
                    server: Some(candidate.name),
                    attempts,
                }
            }
            None => {
                tracing::warn!(
                    episode = %episode,
                    category = %category,
                    tried = attempts.len(),
                    "All server candidates exhausted"
                );
                Resolution {
                    bundle: None,
                    server: None,
                    attempts,
                }
            }
        }
    }

    /// Servers offered for an episode: the configured candidates plus any
    /// extra server the primary provider reports.
    pub async fn servers(&self, episode: &EpisodeRef) -> Vec<ServerCandidate> {
        let mut servers = self.candidate_order(None, true);
        let Some(primary) = self.registry.primary() else {
            return servers;
        };

        let mut next_priority = servers.iter().map(|c| c.priority).max().unwrap_or(0);
        for discovered in primary.get_servers(episode).await {
            if servers.iter().any(|c| c.name.eq_ignore_ascii_case(&discovered.name)) {
                continue;
            }
            next_priority = next_priority.saturating_add(1);
            servers.push(ServerCandidate {
                priority: next_priority,
                ..discovered
            });
        }
        servers
    }

    /// Sources already resolved for `episode`, read from the cache only.
    pub async fn cached_sources(&self, episode: &EpisodeRef, category: Category) -> Vec<Source> {
        let Some(cache) = &self.cache else {
            return Vec::new();
        };
        for allow_fallback in [false, true] {
            let key = sources_key(episode, None, category, allow_fallback);
            if let Some(hit) = cache.get_sources(&key).await {
                if let Some(bundle) = &hit.bundle {
                    return bundle.sources.clone();
                }
            }
        }
        Vec::new()
    }

    /// First embeddable player page among the candidates, walked in the
    /// same order as [`Self::resolve`] without fallback.
    pub async fn embed(
        &self,
        episode: &EpisodeRef,
        server: Option<&str>,
        category: Category,
    ) -> Option<EmbedLink> {
        let candidates = self.candidate_order(server, false);
        let run = first_success(candidates, self.candidate_timeout, |candidate: ServerCandidate| async move {
            let Some(provider) = self.registry.get(candidate.provider_kind) else {
                return Step::Empty;
            };
            match provider.get_embed(episode, candidate.upstream_name(), category).await {
                Ok(Some(link)) => Step::Done(EmbedLink {
                    server: candidate.name.clone(),
                    ..link
                }),
                Ok(None) => Step::Empty,
                Err(e) => Step::Failed(e.to_string()),
            }
        })
        .await;

        for (candidate, outcome) in &run.trail {
            if let StepOutcome::Failed(detail) = outcome {
                tracing::debug!(episode = %episode, server = %candidate.name, error = %detail, "No embed from server");
            }
        }
        run.winner.map(|(_, link)| link)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProviderKind;
    use crate::provider::{AnimeProvider, ProviderError};
    use crate::test_helpers::{bundle_with, MockProvider, Scripted};

    fn candidates() -> Vec<ServerCandidate> {
        vec![
            ServerCandidate::new("hd-2", ProviderKind::OfficialApi, 2),
            ServerCandidate::new("hd-1", ProviderKind::OfficialApi, 1),
            ServerCandidate::new("megacloud", ProviderKind::HtmlScrape, 3).with_upstream("hd-1"),
            ServerCandidate::new("vidstreaming", ProviderKind::GoGoAnime, 4),
        ]
    }

    struct Fixture {
        official: Arc<MockProvider>,
        scrape: Arc<MockProvider>,
        gogo: Arc<MockProvider>,
    }

    impl Fixture {
        fn new(official: MockProvider, scrape: MockProvider, gogo: MockProvider) -> Self {
            Self {
                official: Arc::new(official),
                scrape: Arc::new(scrape),
                gogo: Arc::new(gogo),
            }
        }

        fn resolver(&self) -> SourceResolver {
            let registry = ProviderRegistry::new()
                .with(self.official.clone() as Arc<dyn AnimeProvider>)
                .with(self.scrape.clone() as Arc<dyn AnimeProvider>)
                .with(self.gogo.clone() as Arc<dyn AnimeProvider>);
            SourceResolver::new(registry, candidates())
        }

        fn total_calls(&self) -> usize {
            self.official.call_count() + self.scrape.call_count() + self.gogo.call_count()
        }
    }

    fn episode() -> EpisodeRef {
        EpisodeRef::parse("naruto-100?ep=1").unwrap()
    }

    #[tokio::test]
    async fn test_exhaustion_tries_every_candidate_once() {
        let fixture = Fixture::new(
            MockProvider::new(ProviderKind::OfficialApi).with("hd-1", Scripted::Empty),
            MockProvider::new(ProviderKind::HtmlScrape),
            MockProvider::new(ProviderKind::GoGoAnime)
                .with("vidstreaming", Scripted::Fail(ProviderError::UpstreamBlocked("403".into()))),
        );

        let request = ResolveRequest::new(episode(), Category::Sub).with_fallback(true);
        let resolution = fixture.resolver().resolve(&request).await;

        assert!(resolution.is_exhausted());
        assert_eq!(resolution.tried_servers(), vec!["hd-1", "hd-2", "megacloud", "vidstreaming"]);
        assert_eq!(fixture.total_calls(), 4);
        assert_eq!(resolution.attempts[3].outcome, AttemptOutcome::Error);
        assert!(resolution.attempts[3].error_detail.as_deref().unwrap().contains("403"));
        assert!(resolution.error().unwrap().contains("4 server(s) (1 failed)"));
    }

    #[tokio::test]
    async fn test_short_circuits_on_first_success() {
        let fixture = Fixture::new(
            MockProvider::new(ProviderKind::OfficialApi)
                .with("hd-1", Scripted::Empty)
                .with("hd-2", Scripted::Sources(bundle_with("https://cdn.example/b.m3u8"))),
            MockProvider::new(ProviderKind::HtmlScrape)
                .with("hd-1", Scripted::Sources(bundle_with("https://cdn.example/c.m3u8"))),
            MockProvider::new(ProviderKind::GoGoAnime),
        );

        let request = ResolveRequest::new(episode(), Category::Sub).with_fallback(true);
        let resolution = fixture.resolver().resolve(&request).await;

        assert_eq!(resolution.server.as_deref(), Some("hd-2"));
        assert_eq!(resolution.tried_servers(), vec!["hd-1", "hd-2"]);
        assert_eq!(fixture.scrape.call_count(), 0);
        assert_eq!(fixture.gogo.call_count(), 0);
        assert_eq!(resolution.bundle.as_ref().unwrap().sources[0].server, "hd-2");
    }

    #[tokio::test]
    async fn test_requested_server_is_tried_first() {
        let fixture = Fixture::new(
            MockProvider::new(ProviderKind::OfficialApi),
            MockProvider::new(ProviderKind::HtmlScrape),
            MockProvider::new(ProviderKind::GoGoAnime),
        );

        let request = ResolveRequest::new(episode(), Category::Dub).with_server("hd-2");
        let resolution = fixture.resolver().resolve(&request).await;

        assert_eq!(fixture.official.calls()[0], "hd-2");
        assert_eq!(resolution.tried_servers(), vec!["hd-2", "hd-1", "megacloud", "vidstreaming"]);
    }

    #[tokio::test]
    async fn test_fallback_ignores_requested_server() {
        let fixture = Fixture::new(
            MockProvider::new(ProviderKind::OfficialApi),
            MockProvider::new(ProviderKind::HtmlScrape),
            MockProvider::new(ProviderKind::GoGoAnime)
                .with("vidstreaming", Scripted::Sources(bundle_with("https://gogo.example/v.m3u8"))),
        );

        let request = ResolveRequest::new(episode(), Category::Sub)
            .with_server("vidstreaming")
            .with_fallback(true);
        let resolution = fixture.resolver().resolve(&request).await;

        assert_eq!(resolution.tried_servers(), vec!["hd-1", "hd-2", "megacloud", "vidstreaming"]);
        assert_eq!(resolution.server.as_deref(), Some("vidstreaming"));
    }

    #[tokio::test]
    async fn test_end_to_end_priority_prefix() {
        let fixture = Fixture::new(
            MockProvider::new(ProviderKind::OfficialApi)
                .with("hd-1", Scripted::Fail(ProviderError::UpstreamUnavailable("connection reset".into())))
                .with("hd-2", Scripted::Empty),
            MockProvider::new(ProviderKind::HtmlScrape)
                .with("hd-1", Scripted::Sources(bundle_with("https://cdn.example/naruto/master.m3u8"))),
            MockProvider::new(ProviderKind::GoGoAnime),
        );

        let request = ResolveRequest::new(episode(), Category::Sub)
            .with_server("hd-1")
            .with_fallback(true);
        let resolution = fixture.resolver().resolve(&request).await;

        assert_eq!(resolution.server.as_deref(), Some("megacloud"));
        assert_eq!(resolution.tried_servers(), vec!["hd-1", "hd-2", "megacloud"]);
        let bundle = resolution.bundle.as_ref().unwrap();
        assert_eq!(bundle.sources[0].url, "https://cdn.example/naruto/master.m3u8");
        assert_eq!(bundle.sources[0].server, "megacloud");
        // mapped candidates ask the provider for their upstream name
        assert_eq!(fixture.scrape.calls(), vec!["hd-1"]);
        assert_eq!(fixture.gogo.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_out_candidate_counts_as_error() {
        let fixture = Fixture::new(
            MockProvider::new(ProviderKind::OfficialApi)
                .with("hd-1", Scripted::Hang(Duration::from_secs(120)))
                .with("hd-2", Scripted::Sources(bundle_with("https://cdn.example/b.m3u8"))),
            MockProvider::new(ProviderKind::HtmlScrape),
            MockProvider::new(ProviderKind::GoGoAnime),
        );

        let resolver = fixture.resolver().with_candidate_timeout(Duration::from_secs(5));
        let resolution = resolver
            .resolve(&ResolveRequest::new(episode(), Category::Sub))
            .await;

        assert_eq!(resolution.server.as_deref(), Some("hd-2"));
        assert_eq!(resolution.attempts[0].outcome, AttemptOutcome::Error);
        assert!(resolution.attempts[0].error_detail.as_deref().unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_unregistered_providers_are_skipped() {
        let official = Arc::new(MockProvider::new(ProviderKind::OfficialApi));
        let registry = ProviderRegistry::new().with(official.clone() as Arc<dyn AnimeProvider>);
        let resolver = SourceResolver::new(registry, candidates());

        let names: Vec<String> = resolver.candidate_order(None, true).into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["hd-1", "hd-2"]);
    }

    #[test]
    fn test_unknown_requested_server_leads_on_top_provider() {
        let fixture = Fixture::new(
            MockProvider::new(ProviderKind::OfficialApi),
            MockProvider::new(ProviderKind::HtmlScrape),
            MockProvider::new(ProviderKind::GoGoAnime),
        );
        let order = fixture.resolver().candidate_order(Some("streamsb"), false);
        assert_eq!(order[0].name, "streamsb");
        assert_eq!(order[0].provider_kind, ProviderKind::OfficialApi);
        assert_eq!(order.len(), 5);

        let default_first = fixture.resolver().with_default_server("megacloud").candidate_order(None, false);
        assert_eq!(default_first[0].name, "megacloud");
        assert_eq!(default_first[1].name, "hd-1");
    }

    #[tokio::test]
    async fn test_cache_serves_repeated_success() {
        let fixture = Fixture::new(
            MockProvider::new(ProviderKind::OfficialApi)
                .with("hd-1", Scripted::Sources(bundle_with("https://cdn.example/a.m3u8"))),
            MockProvider::new(ProviderKind::HtmlScrape),
            MockProvider::new(ProviderKind::GoGoAnime),
        );
        let resolver = fixture
            .resolver()
            .with_cache(Some(ResolutionCache::new(10, Duration::from_secs(60))));
        let request = ResolveRequest::new(episode(), Category::Sub);

        let first = resolver.resolve(&request).await;
        let second = resolver.resolve(&request).await;
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(fixture.official.call_count(), 1);

        let cached = resolver.cached_sources(&episode(), Category::Sub).await;
        assert_eq!(cached[0].url, "https://cdn.example/a.m3u8");
        assert!(resolver.cached_sources(&episode(), Category::Dub).await.is_empty());
    }

    #[tokio::test]
    async fn test_exhausted_runs_are_not_cached() {
        let fixture = Fixture::new(
            MockProvider::new(ProviderKind::OfficialApi),
            MockProvider::new(ProviderKind::HtmlScrape),
            MockProvider::new(ProviderKind::GoGoAnime),
        );
        let resolver = fixture
            .resolver()
            .with_cache(Some(ResolutionCache::new(10, Duration::from_secs(60))));
        let request = ResolveRequest::new(episode(), Category::Sub);

        resolver.resolve(&request).await;
        resolver.resolve(&request).await;
        assert_eq!(fixture.total_calls(), 8);
    }

    #[tokio::test]
    async fn test_servers_merge_discovered() {
        let fixture = Fixture::new(
            MockProvider::new(ProviderKind::OfficialApi)
                .with("hd-1", Scripted::Empty)
                .with("hd-3", Scripted::Empty),
            MockProvider::new(ProviderKind::HtmlScrape),
            MockProvider::new(ProviderKind::GoGoAnime),
        );
        let servers = fixture.resolver().servers(&episode()).await;
        let names: Vec<&str> = servers.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["hd-1", "hd-2", "megacloud", "vidstreaming", "hd-3"]);
        assert_eq!(servers[4].priority, 5);
    }

    #[tokio::test]
    async fn test_embed_walks_candidates() {
        let fixture = Fixture::new(
            MockProvider::new(ProviderKind::OfficialApi),
            MockProvider::new(ProviderKind::HtmlScrape).with_embed("hd-1", "https://megacloud.example/embed-2/e-1/abc"),
            MockProvider::new(ProviderKind::GoGoAnime),
        );
        let link = fixture
            .resolver()
            .embed(&episode(), Some("hd-2"), Category::Sub)
            .await
            .unwrap();
        assert_eq!(link.url, "https://megacloud.example/embed-2/e-1/abc");
        assert_eq!(link.server, "megacloud");

        let nothing = Fixture::new(
            MockProvider::new(ProviderKind::OfficialApi),
            MockProvider::new(ProviderKind::HtmlScrape),
            MockProvider::new(ProviderKind::GoGoAnime),
        );
        assert!(nothing.resolver().embed(&episode(), None, Category::Sub).await.is_none());
    }
}
