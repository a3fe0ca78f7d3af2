//! Provider registry and service construction

use std::sync::Arc;

use anistream_media_providers::{
    AnimePaheClient, AniwatchClient, GogoanimeClient, NineAnimeClient, ZoroClient,
};
use anyhow::Result;
use tracing::info;

use crate::cache::ResolutionCache;
use crate::extractor::{ExtractorSet, GogoCipher};
use crate::models::ProviderKind;
use crate::provider::{
    AnimePaheProvider, AnimeProvider, AniwatchProvider, GogoanimeProvider, NineAnimeProvider,
    ProviderRegistry, ZoroProvider,
};
use crate::service::{CatalogService, SourceResolver};
use crate::Config;

/// Services shared by every request handler
#[derive(Clone, Debug)]
pub struct Services {
    pub resolver: SourceResolver,
    pub catalog: CatalogService,
}

/// Registration order: kinds named by resolution candidates first, by
/// priority, then every other kind.
fn registration_order(config: &Config) -> Vec<ProviderKind> {
    let mut order: Vec<ProviderKind> = Vec::new();
    let from_candidates = config
        .resolution
        .server_candidates()
        .into_iter()
        .map(|c| c.provider_kind);
    for kind in from_candidates.chain(ProviderKind::ALL) {
        if !order.contains(&kind) {
            order.push(kind);
        }
    }
    order
}

fn build_provider(
    kind: ProviderKind,
    config: &Config,
    extractors: &ExtractorSet,
) -> Result<Arc<dyn AnimeProvider>> {
    let providers = &config.providers;
    let timeout = config.timeouts.to_timeout_config().search;

    let provider: Arc<dyn AnimeProvider> = match kind {
        ProviderKind::OfficialApi => Arc::new(AniwatchProvider::new(AniwatchClient::new(
            &providers.aniwatch.base_url,
            timeout,
        )?)),
        ProviderKind::HtmlScrape => Arc::new(ZoroProvider::new(
            kind,
            ZoroClient::new(&providers.hianime.base_url, timeout)?,
            extractors.clone(),
        )),
        ProviderKind::Zoro => Arc::new(ZoroProvider::new(
            kind,
            ZoroClient::new(&providers.zoro.base_url, timeout)?,
            extractors.clone(),
        )),
        ProviderKind::GoGoAnime => Arc::new(GogoanimeProvider::new(
            GogoanimeClient::new(
                &providers.gogoanime.base_url,
                &providers.gogoanime.ajax_url,
                timeout,
            )?,
            extractors.clone(),
        )),
        ProviderKind::AnimePahe => Arc::new(AnimePaheProvider::new(
            AnimePaheClient::new(&providers.animepahe.base_url, timeout)?,
            extractors.clone(),
        )),
        ProviderKind::NineAnime => Arc::new(NineAnimeProvider::new(
            NineAnimeClient::new(&providers.nineanime.base_url, timeout)?,
            extractors.clone(),
        )),
    };
    Ok(provider)
}

/// Build the registry of every enabled provider.
pub fn build_registry(config: &Config) -> Result<ProviderRegistry> {
    let timeouts = config.timeouts.to_timeout_config();
    let cipher = GogoCipher::new(
        &config.providers.gogoanime.cipher.key,
        &config.providers.gogoanime.cipher.iv,
    )?;
    let kwik_referer = format!(
        "{}/",
        config.providers.animepahe.base_url.trim_end_matches('/')
    );
    let extractors = ExtractorSet::standard(cipher, Some(kwik_referer), timeouts.extraction)?;

    let mut registry = ProviderRegistry::new();
    for kind in registration_order(config) {
        if config.providers.is_enabled(kind) {
            registry.register(build_provider(kind, config, &extractors)?);
        }
    }

    if registry.is_empty() {
        return Err(anyhow::anyhow!("Every provider is disabled"));
    }
    info!(providers = ?registry.kinds(), "Provider registry built");
    Ok(registry)
}

/// Wire the resolver and catalogue around `registry`.
#[must_use]
pub fn init_services(config: &Config, registry: ProviderRegistry) -> Services {
    let cache = ResolutionCache::from_config(&config.cache);
    if cache.is_none() {
        info!("Result cache disabled");
    }
    Services {
        resolver: SourceResolver::from_config(registry.clone(), &config.resolution)
            .with_cache(cache.clone()),
        catalog: CatalogService::new(registry, cache),
    }
}
