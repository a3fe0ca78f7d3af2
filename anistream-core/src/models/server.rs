use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Upstream family a candidate is served by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderKind {
    #[serde(rename = "official_api")]
    OfficialApi,
    #[serde(rename = "html_scrape")]
    HtmlScrape,
    #[serde(rename = "gogoanime")]
    GoGoAnime,
    #[serde(rename = "zoro")]
    Zoro,
    #[serde(rename = "animepahe")]
    AnimePahe,
    #[serde(rename = "nineanime")]
    NineAnime,
}

impl ProviderKind {
    pub const ALL: [Self; 6] = [
        Self::OfficialApi,
        Self::HtmlScrape,
        Self::GoGoAnime,
        Self::Zoro,
        Self::AnimePahe,
        Self::NineAnime,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OfficialApi => "official_api",
            Self::HtmlScrape => "html_scrape",
            Self::GoGoAnime => "gogoanime",
            Self::Zoro => "zoro",
            Self::AnimePahe => "animepahe",
            Self::NineAnime => "nineanime",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == wanted)
            .or(match wanted.as_str() {
                "official" | "aniwatch" | "api" => Some(Self::OfficialApi),
                "hianime" | "scrape" => Some(Self::HtmlScrape),
                "gogo" => Some(Self::GoGoAnime),
                "9anime" | "nine_anime" => Some(Self::NineAnime),
                "pahe" | "anime_pahe" => Some(Self::AnimePahe),
                _ => None,
            })
            .ok_or_else(|| Error::InvalidInput(format!("Unknown provider: {s}")))
    }
}

/// A named streaming backend tried by the resolver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerCandidate {
    pub name: String,
    pub provider_kind: ProviderKind,
    /// Lower is tried first
    pub priority: i32,
    /// Server name to ask the provider for, when it differs from `name`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream_server: Option<String>,
}

impl ServerCandidate {
    #[must_use]
    pub fn new(name: impl Into<String>, provider_kind: ProviderKind, priority: i32) -> Self {
        Self {
            name: name.into(),
            provider_kind,
            priority,
            upstream_server: None,
        }
    }

    #[must_use]
    pub fn with_upstream(mut self, server: impl Into<String>) -> Self {
        self.upstream_server = Some(server.into());
        self
    }

    /// Name passed to the provider's `get_sources`.
    #[must_use]
    pub fn upstream_name(&self) -> &str {
        self.upstream_server.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AttemptOutcome {
    Success,
    EmptyResult,
    Error,
}

/// Bookkeeping for one candidate tried during a resolution run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionAttempt {
    pub server: String,
    pub outcome: AttemptOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}
