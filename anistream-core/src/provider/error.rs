// Provider Error Types

use anistream_media_providers::ProviderClientError;

/// Failure of a provider adapter or embed extractor
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    /// Network failure, timeout or upstream 5xx
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Upstream answered but offered nothing usable
    #[error("Upstream returned no usable sources: {0}")]
    UpstreamEmpty(String),

    /// HTTP 403 or an anti-bot interstitial
    #[error("Upstream blocked the request: {0}")]
    UpstreamBlocked(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Decryption failed: {0}")]
    DecryptionFailure(String),

    #[error("Extraction failed: {0}")]
    ExtractionFailure(String),

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Unsupported: {0}")]
    Unsupported(String),
}

impl ProviderError {
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<ProviderClientError> for ProviderError {
    fn from(err: ProviderClientError) -> Self {
        match err.status().map(|s| s.as_u16()) {
            Some(403) => Self::UpstreamBlocked(err.to_string()),
            Some(404) => Self::NotFound(err.to_string()),
            Some(_) => Self::UpstreamUnavailable(err.to_string()),
            None => match err {
                ProviderClientError::Parse(msg) => Self::ExtractionFailure(msg),
                ProviderClientError::InvalidConfig(msg) => Self::MalformedInput(msg),
                other => Self::UpstreamUnavailable(other.to_string()),
            },
        }
    }
}

impl From<crate::Error> for ProviderError {
    fn from(err: crate::Error) -> Self {
        Self::MalformedInput(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ProviderError>;
