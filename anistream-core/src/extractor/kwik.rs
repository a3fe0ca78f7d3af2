//! Packed-script embed (kwik family)

use std::collections::HashMap;
use std::sync::LazyLock;

use anistream_media_providers::error::{check_response, text_with_limit};
use anistream_media_providers::scrape::{attr, first_non_empty, Strategy};
use anistream_media_providers::ProviderClientError;
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};
use url::Url;

use super::Extractor;
use crate::models::{Source, SourceBundle};
use crate::provider::ProviderError;

static MP4_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href*=\".mp4\"]").expect("invalid selector"));
static MP4_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s"'<>\\]+\.mp4[^\s"'<>\\]*"#).expect("invalid regex"));
static M3U8_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s"'<>\\]+\.m3u8[^\s"'<>\\]*"#).expect("invalid regex"));

pub struct KwikExtractor {
    client: Client,
    /// Page the embed expects to be opened from
    referer: Option<String>,
}

impl KwikExtractor {
    #[must_use]
    pub const fn new(client: Client, referer: Option<String>) -> Self {
        Self { client, referer }
    }
}

#[async_trait]
impl Extractor for KwikExtractor {
    fn name(&self) -> &'static str {
        "kwik"
    }

    fn matches(&self, url: &Url) -> bool {
        url.host_str().is_some_and(|h| h.to_ascii_lowercase().contains("kwik"))
    }

    async fn try_extract(&self, embed_url: &Url) -> Result<SourceBundle, ProviderError> {
        let mut request = self.client.get(embed_url.as_str());
        if let Some(referer) = &self.referer {
            request = request.header("Referer", referer);
        }
        let resp = request.send().await.map_err(ProviderClientError::from)?;
        let page = text_with_limit(check_response(resp)?).await?;

        let stream = find_stream(&page).ok_or_else(|| {
            ProviderError::ExtractionFailure("kwik page exposes no stream URL".to_string())
        })?;

        let headers = HashMap::from([(
            "Referer".to_string(),
            format!("{}/", embed_url.origin().ascii_serialization()),
        )]);
        Ok(SourceBundle {
            sources: vec![Source::new(stream, self.name()).with_headers(headers.clone())],
            headers,
            ..SourceBundle::default()
        })
    }
}

fn mp4_anchor(doc: &Html) -> Vec<String> {
    doc.select(&MP4_LINK).filter_map(|a| attr(&a, "href")).collect()
}

fn mp4_in_text(doc: &Html) -> Vec<String> {
    scan(&MP4_URL, &doc.html())
}

fn m3u8_in_text(doc: &Html) -> Vec<String> {
    scan(&M3U8_URL, &doc.html())
}

fn scan(re: &Regex, text: &str) -> Vec<String> {
    re.find_iter(text).map(|m| m.as_str().to_string()).collect()
}

/// First direct stream URL on a kwik page.
pub(crate) fn find_stream(page: &str) -> Option<String> {
    let doc = Html::parse_document(page);
    let strategies: [Strategy<String>; 3] = [
        ("mp4-anchor", mp4_anchor),
        ("mp4-text", mp4_in_text),
        ("m3u8-text", m3u8_in_text),
    ];
    first_non_empty(&doc, &strategies, |u| u.starts_with("https://") || u.starts_with("http://"))
        .into_iter()
        .next()
}
