//! JSON-endpoint embed (rapid-cloud / megacloud family)
//!
//! The player page is never scraped: the embed id is sent to the host's
//! `getSources` endpoint, which answers with playlists, caption tracks and
//! skip markers. Hosts that still encrypt `sources` are reported as an
//! extraction failure.

use std::collections::HashMap;

use anistream_media_providers::error::{check_response, json_with_limit};
use anistream_media_providers::ProviderClientError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use super::Extractor;
use crate::models::{Source, SourceBundle, SubtitleTrack, TimeRange};
use crate::provider::ProviderError;

const HOST_MARKERS: [&str; 7] = [
    "rapid-cloud",
    "megacloud",
    "rabbitstream",
    "dokicloud",
    "vidplay",
    "mcloud",
    "vizcloud",
];

#[derive(Debug, Deserialize)]
struct SourcesResponse {
    #[serde(default)]
    sources: serde_json::Value,
    #[serde(default)]
    tracks: Vec<Track>,
    #[serde(default)]
    intro: Option<Marker>,
    #[serde(default)]
    outro: Option<Marker>,
}

#[derive(Debug, Deserialize)]
struct StreamFile {
    file: String,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Track {
    file: String,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Marker {
    start: f64,
    end: f64,
}

pub struct RapidCloudExtractor {
    client: Client,
}

impl RapidCloudExtractor {
    #[must_use]
    pub const fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Extractor for RapidCloudExtractor {
    fn name(&self) -> &'static str {
        "rapidcloud"
    }

    fn matches(&self, url: &Url) -> bool {
        let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
        HOST_MARKERS.iter().any(|m| host.contains(m))
    }

    async fn try_extract(&self, embed_url: &Url) -> Result<SourceBundle, ProviderError> {
        let endpoint = sources_endpoint(embed_url)?;
        tracing::debug!(endpoint = %endpoint, "Requesting embed sources");

        let resp = self
            .client
            .get(endpoint)
            .header("X-Requested-With", "XMLHttpRequest")
            .header("Referer", embed_url.as_str())
            .send()
            .await
            .map_err(ProviderClientError::from)?;
        let body: SourcesResponse = json_with_limit(check_response(resp)?).await?;

        bundle_from_response(body, embed_url, self.name())
    }
}

/// `getSources` URL for an embed page.
///
/// | embed path            | endpoint                                  |
/// |-----------------------|-------------------------------------------|
/// | `/embed-2/e-1/<id>`   | `/embed-2/ajax/e-1/getSources?id=<id>`    |
/// | `/embed-6/<id>`       | `/ajax/embed-6/getSources?id=<id>`        |
/// | anything else         | `/ajax/embed/getSources?id=<last segment>`|
pub(crate) fn sources_endpoint(embed_url: &Url) -> Result<Url, ProviderError> {
    let segments: Vec<&str> = embed_url
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).collect())
        .unwrap_or_default();
    let id = segments
        .last()
        .copied()
        .ok_or_else(|| ProviderError::MalformedInput(format!("Embed URL has no id: {embed_url}")))?;

    let path = match segments.as_slice() {
        ["embed-2", "e-1", ..] => "/embed-2/ajax/e-1/getSources",
        ["embed-6", ..] => "/ajax/embed-6/getSources",
        _ => "/ajax/embed/getSources",
    };

    let mut endpoint = embed_url
        .join(path)
        .map_err(|e| ProviderError::MalformedInput(e.to_string()))?;
    endpoint.query_pairs_mut().clear().append_pair("id", id);
    Ok(endpoint)
}

fn bundle_from_response(
    body: SourcesResponse,
    embed_url: &Url,
    server: &str,
) -> Result<SourceBundle, ProviderError> {
    if body.sources.is_string() {
        return Err(ProviderError::ExtractionFailure(
            "sources are encrypted".to_string(),
        ));
    }
    let files: Vec<StreamFile> = serde_json::from_value(body.sources)
        .map_err(|e| ProviderError::ExtractionFailure(format!("unexpected sources shape: {e}")))?;

    let sources = files
        .into_iter()
        .map(|f| {
            let hls = f.kind.as_deref() == Some("hls");
            let source = Source::new(f.file, server);
            let is_playlist = hls || source.is_playlist;
            source.with_playlist(is_playlist)
        })
        .collect();

    let tracks = body
        .tracks
        .into_iter()
        .filter(|t| t.kind.as_deref() == Some("captions"))
        .map(|t| SubtitleTrack {
            url: t.file,
            lang: t.label.unwrap_or_else(|| "Unknown".to_string()),
        })
        .collect();

    let origin = embed_url.origin().ascii_serialization();
    Ok(SourceBundle {
        sources,
        headers: HashMap::from([("Referer".to_string(), format!("{origin}/"))]),
        tracks,
        intro: body.intro.and_then(|m| TimeRange::new(m.start, m.end)),
        outro: body.outro.and_then(|m| TimeRange::new(m.start, m.end)),
    })
}
