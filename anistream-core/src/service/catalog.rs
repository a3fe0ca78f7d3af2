//! Catalogue lookups
//!
//! Search, info and episode listing routed to one provider, defaulting to
//! the registry's primary. Search results are cached.

use std::sync::Arc;

use crate::cache::{search_key, ResolutionCache};
use crate::models::{AnimeInfo, AnimeSummary, Episode, ProviderKind};
use crate::provider::{AnimeProvider, ProviderRegistry};
use crate::{Error, Result};

#[derive(Clone)]
pub struct CatalogService {
    registry: ProviderRegistry,
    cache: Option<ResolutionCache>,
}

impl std::fmt::Debug for CatalogService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogService")
            .field("providers", &self.registry.kinds())
            .finish_non_exhaustive()
    }
}

impl CatalogService {
    #[must_use]
    pub const fn new(registry: ProviderRegistry, cache: Option<ResolutionCache>) -> Self {
        Self { registry, cache }
    }

    fn provider(&self, kind: Option<ProviderKind>) -> Result<Arc<dyn AnimeProvider>> {
        match kind {
            Some(kind) => self
                .registry
                .get(kind)
                .ok_or_else(|| Error::InvalidInput(format!("Provider {kind} is not enabled"))),
            None => self
                .registry
                .primary()
                .ok_or_else(|| Error::Internal("No providers registered".to_string())),
        }
    }

    pub async fn search(&self, query: &str, kind: Option<ProviderKind>) -> Result<Arc<Vec<AnimeSummary>>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::InvalidInput("Search query must not be empty".to_string()));
        }
        let provider = self.provider(kind)?;
        let key = search_key(provider.kind(), query);

        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get_search(&key).await {
                return Ok(hit);
            }
        }

        let results = Arc::new(provider.search(query).await);
        tracing::debug!(provider = %provider.kind(), query, results = results.len(), "Search completed");
        if let Some(cache) = &self.cache {
            cache.insert_search(key, Arc::clone(&results)).await;
        }
        Ok(results)
    }

    /// `Ok(None)` when the provider does not know the title.
    pub async fn info(&self, anime_id: &str, kind: Option<ProviderKind>) -> Result<Option<AnimeInfo>> {
        let anime_id = validated_id(anime_id)?;
        Ok(self.provider(kind)?.get_info(anime_id).await)
    }

    pub async fn episodes(&self, anime_id: &str, kind: Option<ProviderKind>) -> Result<Vec<Episode>> {
        let anime_id = validated_id(anime_id)?;
        Ok(self.provider(kind)?.list_episodes(anime_id).await)
    }
}

fn validated_id(anime_id: &str) -> Result<&str> {
    let anime_id = anime_id.trim();
    if anime_id.is_empty() || anime_id.contains('?') {
        return Err(Error::InvalidInput(format!("Invalid anime id: {anime_id:?}")));
    }
    Ok(anime_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::MockProvider;
    use std::time::Duration;

    fn service(cache: Option<ResolutionCache>) -> CatalogService {
        let registry = ProviderRegistry::new()
            .with(Arc::new(
                MockProvider::new(ProviderKind::OfficialApi)
                    .with_title("naruto-677", "Naruto")
                    .with_title("boruto-8143", "Boruto"),
            ))
            .with(Arc::new(MockProvider::new(ProviderKind::GoGoAnime).with_title("naruto", "Naruto")));
        CatalogService::new(registry, cache)
    }

    #[tokio::test]
    async fn test_search_defaults_to_primary() {
        let results = service(None).search("  NARUTO ", None).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].provider, ProviderKind::OfficialApi);

        let gogo = service(None).search("naruto", Some(ProviderKind::GoGoAnime)).await.unwrap();
        assert_eq!(gogo[0].id, "naruto");
    }

    #[tokio::test]
    async fn test_search_rejects_bad_input() {
        assert!(matches!(service(None).search("   ", None).await, Err(Error::InvalidInput(_))));
        assert!(matches!(
            service(None).search("naruto", Some(ProviderKind::Zoro)).await,
            Err(Error::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_search_is_cached() {
        let svc = service(Some(ResolutionCache::new(10, Duration::from_secs(60))));
        let first = svc.search("naruto", None).await.unwrap();
        let second = svc.search("Naruto", None).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_info_and_episodes() {
        let svc = service(None);
        assert_eq!(svc.info("boruto-8143", None).await.unwrap().unwrap().title, "Boruto");
        assert!(svc.info("bleach", None).await.unwrap().is_none());
        assert!(svc.info("naruto?ep=1", None).await.is_err());

        let episodes = svc.episodes("naruto-677", None).await.unwrap();
        assert_eq!(episodes[1].id, "naruto-677?ep=2");
    }
}
