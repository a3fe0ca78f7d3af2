//! Test helpers and fixtures for anistream-core tests
//!
//! [`MockProvider`] is a scripted [`AnimeProvider`]: each server name is
//! given an outcome up front and every call is recorded, so resolver tests
//! can assert exactly which candidates were tried and in what order.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::models::{
    AnimeInfo, AnimeSummary, Category, Episode, EpisodeRef, ProviderKind, ServerCandidate, Source,
    SourceBundle,
};
use crate::provider::{AnimeProvider, EmbedLink, ProviderError};

/// Scripted answer for one server
#[derive(Debug, Clone)]
pub enum Scripted {
    Sources(SourceBundle),
    Empty,
    Fail(ProviderError),
    /// Sleep before answering empty; exercises timeouts
    Hang(Duration),
}

/// One-source bundle pointing at `url`
#[must_use]
pub fn bundle_with(url: &str) -> SourceBundle {
    SourceBundle {
        sources: vec![Source::new(url, "mock")],
        ..SourceBundle::default()
    }
}

/// Scripted provider recording every `get_sources` call
pub struct MockProvider {
    kind: ProviderKind,
    scripts: HashMap<String, Scripted>,
    embeds: HashMap<String, String>,
    catalogue: Vec<AnimeSummary>,
    calls: Mutex<Vec<String>>,
}

impl MockProvider {
    #[must_use]
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            scripts: HashMap::new(),
            embeds: HashMap::new(),
            catalogue: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Script the outcome for `server`; unscripted servers answer empty.
    #[must_use]
    pub fn with(mut self, server: &str, outcome: Scripted) -> Self {
        self.scripts.insert(server.to_string(), outcome);
        self
    }

    #[must_use]
    pub fn with_embed(mut self, server: &str, url: &str) -> Self {
        self.embeds.insert(server.to_string(), url.to_string());
        self
    }

    /// Titles answered by `search`, `get_info` and `list_episodes`.
    #[must_use]
    pub fn with_title(mut self, id: &str, title: &str) -> Self {
        self.catalogue.push(AnimeSummary {
            id: id.to_string(),
            title: title.to_string(),
            poster: None,
            provider: self.kind,
        });
        self
    }

    /// Server names passed to `get_sources`, in call order.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls().len()
    }
}

#[async_trait]
impl AnimeProvider for MockProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn search(&self, query: &str) -> Vec<AnimeSummary> {
        let query = query.to_lowercase();
        self.catalogue
            .iter()
            .filter(|a| a.title.to_lowercase().contains(&query))
            .cloned()
            .collect()
    }

    async fn get_info(&self, anime_id: &str) -> Option<AnimeInfo> {
        self.catalogue.iter().find(|a| a.id == anime_id).map(|a| AnimeInfo {
            id: a.id.clone(),
            title: a.title.clone(),
            poster: None,
            description: None,
            total_episodes: Some(2),
            provider: self.kind,
        })
    }

    async fn list_episodes(&self, anime_id: &str) -> Vec<Episode> {
        if !self.catalogue.iter().any(|a| a.id == anime_id) {
            return Vec::new();
        }
        (1..=2)
            .map(|n| Episode {
                number: n,
                id: format!("{anime_id}?ep={n}"),
                title: None,
                is_filler: false,
                upstream_id: format!("{anime_id}-{n}"),
            })
            .collect()
    }

    async fn get_servers(&self, _episode: &EpisodeRef) -> Vec<ServerCandidate> {
        let mut names: Vec<&String> = self.scripts.keys().collect();
        names.sort();
        names
            .into_iter()
            .enumerate()
            .map(|(i, name)| ServerCandidate::new(name.clone(), self.kind, i32::try_from(i).unwrap_or(i32::MAX)))
            .collect()
    }

    async fn get_sources(
        &self,
        _episode: &EpisodeRef,
        server: &str,
        _category: Category,
    ) -> Result<Option<SourceBundle>, ProviderError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(server.to_string());
        }
        match self.scripts.get(server) {
            Some(Scripted::Sources(bundle)) => Ok(Some(bundle.clone())),
            Some(Scripted::Fail(e)) => Err(e.clone()),
            Some(Scripted::Hang(delay)) => {
                tokio::time::sleep(*delay).await;
                Ok(None)
            }
            Some(Scripted::Empty) | None => Ok(None),
        }
    }

    async fn get_embed(
        &self,
        _episode: &EpisodeRef,
        server: &str,
        _category: Category,
    ) -> Result<Option<EmbedLink>, ProviderError> {
        Ok(self.embeds.get(server).map(|url| EmbedLink {
            url: url.clone(),
            server: server.to_string(),
            server_id: None,
        }))
    }
}
