use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use crate::models::{ProviderKind, ServerCandidate};
use crate::resilience::timeout::TimeoutConfig;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub providers: ProvidersConfig,
    pub resolution: ResolutionConfig,
    pub timeouts: TimeoutsConfig,
    pub cache: CacheConfig,
    pub proxy: ProxyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub http_port: u16,
    /// Externally reachable base URL used when wrapping stream URLs in
    /// proxy links. Empty means `http://<host>:<port>`.
    pub public_base_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            http_port: 3000,
            public_base_url: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "pretty"
    pub file_path: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file_path: None,
        }
    }
}

/// One upstream site
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderEndpoint {
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    pub base_url: String,
}

const fn enabled_by_default() -> bool {
    true
}

impl ProviderEndpoint {
    fn new(base_url: &str) -> Self {
        Self {
            enabled: true,
            base_url: base_url.to_string(),
        }
    }
}

/// AES key material for the gogo embed payload (UTF-8 bytes)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CipherConfig {
    pub key: String,
    pub iv: String,
}

impl Default for CipherConfig {
    fn default() -> Self {
        Self {
            key: "37911490979715163134003223491201".to_string(),
            iv: "3134003223491201".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GogoanimeConfig {
    pub enabled: bool,
    pub base_url: String,
    /// Host serving `/ajax/load-list-episode`
    pub ajax_url: String,
    pub cipher: CipherConfig,
}

impl Default for GogoanimeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://anitaku.pe".to_string(),
            ajax_url: "https://ajax.gogocdn.net".to_string(),
            cipher: CipherConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    /// JSON API fronting the hianime catalogue
    pub aniwatch: ProviderEndpoint,
    pub hianime: ProviderEndpoint,
    pub zoro: ProviderEndpoint,
    pub gogoanime: GogoanimeConfig,
    pub animepahe: ProviderEndpoint,
    pub nineanime: ProviderEndpoint,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            aniwatch: ProviderEndpoint::new("http://localhost:4000"),
            hianime: ProviderEndpoint::new("https://hianime.to"),
            zoro: ProviderEndpoint::new("https://zorox.to"),
            gogoanime: GogoanimeConfig::default(),
            animepahe: ProviderEndpoint::new("https://animepahe.ru"),
            nineanime: ProviderEndpoint::new("https://9animetv.to"),
        }
    }
}

impl ProvidersConfig {
    /// Whether the site serving `kind` is enabled.
    #[must_use]
    pub const fn is_enabled(&self, kind: ProviderKind) -> bool {
        match kind {
            ProviderKind::OfficialApi => self.aniwatch.enabled,
            ProviderKind::HtmlScrape => self.hianime.enabled,
            ProviderKind::Zoro => self.zoro.enabled,
            ProviderKind::GoGoAnime => self.gogoanime.enabled,
            ProviderKind::AnimePahe => self.animepahe.enabled,
            ProviderKind::NineAnime => self.nineanime.enabled,
        }
    }

    fn base_urls(&self) -> [(&'static str, &str); 7] {
        [
            ("providers.aniwatch.base_url", &self.aniwatch.base_url),
            ("providers.hianime.base_url", &self.hianime.base_url),
            ("providers.zoro.base_url", &self.zoro.base_url),
            ("providers.gogoanime.base_url", &self.gogoanime.base_url),
            ("providers.gogoanime.ajax_url", &self.gogoanime.ajax_url),
            ("providers.animepahe.base_url", &self.animepahe.base_url),
            ("providers.nineanime.base_url", &self.nineanime.base_url),
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateConfig {
    pub name: String,
    pub provider: ProviderKind,
    pub priority: i32,
    #[serde(default)]
    pub upstream_server: Option<String>,
}

impl From<&CandidateConfig> for ServerCandidate {
    fn from(c: &CandidateConfig) -> Self {
        Self {
            name: c.name.clone(),
            provider_kind: c.provider,
            priority: c.priority,
            upstream_server: c.upstream_server.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolutionConfig {
    /// Server tried first when a request names none
    pub default_server: String,
    /// Upper bound on a single candidate attempt
    pub candidate_timeout_seconds: u64,
    pub candidates: Vec<CandidateConfig>,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        let candidate = |name: &str, provider, priority, upstream: Option<&str>| CandidateConfig {
            name: name.to_string(),
            provider,
            priority,
            upstream_server: upstream.map(ToString::to_string),
        };
        Self {
            default_server: "hd-1".to_string(),
            candidate_timeout_seconds: 30,
            candidates: vec![
                candidate("hd-1", ProviderKind::OfficialApi, 1, None),
                candidate("hd-2", ProviderKind::OfficialApi, 2, None),
                candidate("megacloud", ProviderKind::HtmlScrape, 3, Some("hd-1")),
                candidate("vidstreaming", ProviderKind::GoGoAnime, 4, None),
                candidate("rapidcloud", ProviderKind::Zoro, 5, Some("megacloud")),
                candidate("kwik", ProviderKind::AnimePahe, 6, None),
                candidate("vidplay", ProviderKind::NineAnime, 7, None),
            ],
        }
    }
}

impl ResolutionConfig {
    /// Candidates ordered by ascending priority
    #[must_use]
    pub fn server_candidates(&self) -> Vec<ServerCandidate> {
        let mut list: Vec<ServerCandidate> = self.candidates.iter().map(Into::into).collect();
        list.sort_by_key(|c| c.priority);
        list
    }

    #[must_use]
    pub const fn candidate_timeout(&self) -> Duration {
        Duration::from_secs(self.candidate_timeout_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutsConfig {
    pub search_seconds: u64,
    pub extraction_seconds: u64,
    pub proxy_seconds: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        let defaults = TimeoutConfig::default();
        Self {
            search_seconds: defaults.search.as_secs(),
            extraction_seconds: defaults.extraction.as_secs(),
            proxy_seconds: defaults.proxy.as_secs(),
        }
    }
}

impl TimeoutsConfig {
    #[must_use]
    pub fn to_timeout_config(&self) -> TimeoutConfig {
        TimeoutConfig::new()
            .with_search_timeout(Duration::from_secs(self.search_seconds))
            .with_extraction_timeout(Duration::from_secs(self.extraction_seconds))
            .with_proxy_timeout(Duration::from_secs(self.proxy_seconds))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub max_entries: u64,
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 2_000,
            ttl_seconds: 20 * 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Playlists larger than this are refused rather than rewritten
    pub max_playlist_bytes: usize,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            max_playlist_bytes: 5 * 1024 * 1024,
        }
    }
}

impl Config {
    /// Load configuration from multiple sources with priority:
    /// 1. Environment variables (highest priority)
    /// 2. Config file (if provided)
    /// 3. Defaults (lowest priority)
    pub fn load(config_file: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_file {
            if Path::new(path).exists() {
                builder = builder.add_source(File::with_name(path));
            }
        }

        // ANISTREAM_SERVER__HTTP_PORT, ANISTREAM_PROVIDERS__ZORO__ENABLED, ...
        builder = builder.add_source(
            Environment::with_prefix("ANISTREAM")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    /// Load from environment variables only (for Docker/K8s)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Load from file path
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        Self::load(Some(path))
    }

    /// Get HTTP address
    #[must_use]
    pub fn http_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.http_port)
    }

    /// Base URL clients use to reach this server
    #[must_use]
    pub fn public_base_url(&self) -> String {
        let configured = self.server.public_base_url.trim().trim_end_matches('/');
        if !configured.is_empty() {
            return configured.to_string();
        }
        let host = match self.server.host.as_str() {
            "0.0.0.0" | "::" | "" => "localhost",
            other => other,
        };
        format!("http://{host}:{}", self.server.http_port)
    }

    /// Check every setting, collecting all problems rather than stopping at
    /// the first.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if !matches!(self.logging.format.as_str(), "json" | "pretty") {
            errors.push(format!(
                "logging.format must be \"json\" or \"pretty\", got {:?}",
                self.logging.format
            ));
        }

        if !self.server.public_base_url.is_empty()
            && url::Url::parse(&self.server.public_base_url).is_err()
        {
            errors.push(format!(
                "server.public_base_url is not a valid URL: {}",
                self.server.public_base_url
            ));
        }

        for (field, value) in self.providers.base_urls() {
            match url::Url::parse(value) {
                Ok(u) if matches!(u.scheme(), "http" | "https") => {}
                _ => errors.push(format!("{field} is not a valid http(s) URL: {value:?}")),
            }
        }

        let cipher = &self.providers.gogoanime.cipher;
        if !matches!(cipher.key.len(), 16 | 24 | 32) {
            errors.push(format!(
                "providers.gogoanime.cipher.key must be 16, 24 or 32 bytes, got {}",
                cipher.key.len()
            ));
        }
        if cipher.iv.len() != 16 {
            errors.push(format!(
                "providers.gogoanime.cipher.iv must be 16 bytes, got {}",
                cipher.iv.len()
            ));
        }

        if self.resolution.candidates.is_empty() {
            errors.push("resolution.candidates must not be empty".to_string());
        }
        let mut seen = HashSet::new();
        for candidate in &self.resolution.candidates {
            if candidate.name.trim().is_empty() {
                errors.push("resolution.candidates contains an empty name".to_string());
            } else if !seen.insert(candidate.name.to_ascii_lowercase()) {
                errors.push(format!("Duplicate resolution candidate: {}", candidate.name));
            }
        }
        if self.resolution.default_server.trim().is_empty() {
            errors.push("resolution.default_server must not be empty".to_string());
        }
        if self.resolution.candidate_timeout_seconds == 0 {
            errors.push("resolution.candidate_timeout_seconds must be greater than 0".to_string());
        }

        for (field, value) in [
            ("timeouts.search_seconds", self.timeouts.search_seconds),
            ("timeouts.extraction_seconds", self.timeouts.extraction_seconds),
            ("timeouts.proxy_seconds", self.timeouts.proxy_seconds),
        ] {
            if value == 0 {
                errors.push(format!("{field} must be greater than 0"));
            }
        }

        if self.cache.enabled && (self.cache.max_entries == 0 || self.cache.ttl_seconds == 0) {
            errors.push("cache.max_entries and cache.ttl_seconds must be greater than 0 when the cache is enabled".to_string());
        }
        if self.proxy.max_playlist_bytes == 0 {
            errors.push("proxy.max_playlist_bytes must be greater than 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
