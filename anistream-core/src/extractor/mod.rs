//! Embed extractors
//!
//! Each extractor turns one family of embed pages into direct stream URLs.
//! [`ExtractorSet`] routes a URL to the first extractor claiming it and
//! walks a list of embed URLs until one yields streams.

pub mod gogocdn;
pub mod kwik;
pub mod playlist;
pub mod rapidcloud;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::models::SourceBundle;
use crate::provider::ProviderError;
use crate::resilience::fallback::{first_success, Step, StepOutcome};

pub use gogocdn::{GogoCdnExtractor, GogoCipher};
pub use kwik::KwikExtractor;
pub use rapidcloud::RapidCloudExtractor;

#[async_trait]
pub trait Extractor: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether this extractor handles `url`.
    fn matches(&self, url: &Url) -> bool;

    async fn try_extract(&self, embed_url: &Url) -> Result<SourceBundle, ProviderError>;

    /// Non-throwing form: failures are logged and yield an empty bundle.
    async fn extract(&self, embed_url: &Url) -> SourceBundle {
        match self.try_extract(embed_url).await {
            Ok(bundle) => bundle,
            Err(e) => {
                tracing::warn!(extractor = self.name(), url = %embed_url, error = %e, "Extraction failed");
                SourceBundle::default()
            }
        }
    }
}

/// Ordered extractor router
#[derive(Clone, Default)]
pub struct ExtractorSet {
    extractors: Vec<Arc<dyn Extractor>>,
}

impl ExtractorSet {
    #[must_use]
    pub fn new(extractors: Vec<Arc<dyn Extractor>>) -> Self {
        Self { extractors }
    }

    /// The three stock families sharing one HTTP client.
    pub fn standard(
        cipher: GogoCipher,
        kwik_referer: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = anistream_media_providers::http::build_client(timeout)?;
        Ok(Self::new(vec![
            Arc::new(RapidCloudExtractor::new(client.clone())),
            Arc::new(GogoCdnExtractor::new(client.clone(), cipher)),
            Arc::new(KwikExtractor::new(client, kwik_referer)),
        ]))
    }

    #[must_use]
    pub fn route(&self, url: &Url) -> Option<&Arc<dyn Extractor>> {
        self.extractors.iter().find(|e| e.matches(url))
    }

    /// Extract one embed URL with whichever extractor claims it.
    pub async fn extract(&self, embed_url: &str) -> Result<SourceBundle, ProviderError> {
        let url = Url::parse(embed_url)
            .map_err(|e| ProviderError::MalformedInput(format!("Bad embed URL {embed_url}: {e}")))?;
        let extractor = self
            .route(&url)
            .ok_or_else(|| ProviderError::Unsupported(format!("No extractor for {}", url.host_str().unwrap_or_default())))?;
        tracing::debug!(extractor = extractor.name(), url = %url, "Extracting embed");
        extractor.try_extract(&url).await
    }

    /// First non-empty bundle among `urls`, tried in order; `None` when
    /// every URL fails or comes back empty.
    pub async fn extract_with_fallback(&self, urls: &[String]) -> Option<SourceBundle> {
        let run = first_success(urls.iter().cloned(), None, |url| async move {
            match self.extract(&url).await {
                Ok(bundle) if !bundle.is_empty() => Step::Done(bundle),
                Ok(_) => Step::Empty,
                Err(e) => Step::Failed(e.to_string()),
            }
        })
        .await;

        for (url, outcome) in &run.trail {
            if let StepOutcome::Failed(detail) = outcome {
                tracing::debug!(url = %url, detail = %detail, "Embed candidate failed");
            }
        }
        run.winner.map(|(_, bundle)| bundle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Source;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeExtractor {
        host: &'static str,
        calls: AtomicUsize,
        result: Option<&'static str>,
    }

    #[async_trait]
    impl Extractor for FakeExtractor {
        fn name(&self) -> &'static str {
            "fake"
        }

        fn matches(&self, url: &Url) -> bool {
            url.host_str() == Some(self.host)
        }

        async fn try_extract(&self, _embed_url: &Url) -> Result<SourceBundle, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.result {
                Some(stream) => Ok(SourceBundle {
                    sources: vec![Source::new(stream, "fake")],
                    ..SourceBundle::default()
                }),
                None => Err(ProviderError::ExtractionFailure("no payload".into())),
            }
        }
    }

    fn fake(host: &'static str, result: Option<&'static str>) -> Arc<FakeExtractor> {
        Arc::new(FakeExtractor {
            host,
            calls: AtomicUsize::new(0),
            result,
        })
    }

    #[tokio::test]
    async fn test_extract_with_fallback_skips_failures() {
        let broken = fake("broken.example", None);
        let working = fake("working.example", Some("https://cdn.example/a.m3u8"));
        let set = ExtractorSet::new(vec![broken.clone() as Arc<dyn Extractor>, working.clone()]);

        let bundle = set
            .extract_with_fallback(&[
                "https://unknown.example/e/1".to_string(),
                "https://broken.example/e/1".to_string(),
                "https://working.example/e/1".to_string(),
                "https://working.example/e/2".to_string(),
            ])
            .await
            .unwrap();

        assert_eq!(bundle.sources[0].url, "https://cdn.example/a.m3u8");
        assert_eq!(broken.calls.load(Ordering::SeqCst), 1);
        assert_eq!(working.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_extract_with_fallback_none_when_exhausted() {
        let set = ExtractorSet::new(vec![fake("broken.example", None) as Arc<dyn Extractor>]);
        assert!(set
            .extract_with_fallback(&["https://broken.example/e/1".to_string()])
            .await
            .is_none());
        assert!(set.extract_with_fallback(&[]).await.is_none());
    }

    #[tokio::test]
    async fn test_extract_rejects_bad_url() {
        let set = ExtractorSet::default();
        assert!(matches!(set.extract("not a url").await, Err(ProviderError::MalformedInput(_))));
        assert!(matches!(
            set.extract("https://nobody.example/e/1").await,
            Err(ProviderError::Unsupported(_))
        ));
    }
}
