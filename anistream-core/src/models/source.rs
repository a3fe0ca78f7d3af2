use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Quality label used when the upstream gives none
pub const QUALITY_AUTO: &str = "auto";

/// One playable stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    pub url: String,
    /// `1080p`, `720p`, `480p`, `360p` or `auto`
    pub quality: String,
    pub is_playlist: bool,
    pub server: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,
}

impl Source {
    #[must_use]
    pub fn new(url: impl Into<String>, server: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            is_playlist: looks_like_playlist(&url),
            url,
            quality: QUALITY_AUTO.to_string(),
            server: server.into(),
            headers: None,
        }
    }

    #[must_use]
    pub fn with_quality(mut self, quality: impl Into<String>) -> Self {
        self.quality = normalize_quality(&quality.into());
        self
    }

    #[must_use]
    pub const fn with_playlist(mut self, is_playlist: bool) -> Self {
        self.is_playlist = is_playlist;
        self
    }

    #[must_use]
    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = (!headers.is_empty()).then_some(headers);
        self
    }
}

/// Whether a URL points at an HLS playlist.
#[must_use]
pub fn looks_like_playlist(url: &str) -> bool {
    url.split(['?', '#'])
        .next()
        .is_some_and(|path| path.to_ascii_lowercase().ends_with(".m3u8"))
}

/// Map upstream quality labels (`"1080"`, `"720P"`, `"default"`) onto the
/// canonical set; unknown labels become `auto`.
#[must_use]
pub fn normalize_quality(label: &str) -> String {
    let label = label.trim().to_ascii_lowercase();
    let digits: String = label.chars().take_while(char::is_ascii_digit).collect();
    match digits.as_str() {
        "1080" | "720" | "480" | "360" => format!("{digits}p"),
        _ => QUALITY_AUTO.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleTrack {
    pub url: String,
    pub lang: String,
}

/// Skip marker in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

impl TimeRange {
    /// `None` unless `start < end`.
    #[must_use]
    pub fn new(start: f64, end: f64) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }
}

/// Resolved streams for one episode on one server
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceBundle {
    pub sources: Vec<Source>,
    /// Referer/Origin a client should send when bypassing the proxy
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub tracks: Vec<SubtitleTrack>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intro: Option<TimeRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outro: Option<TimeRange>,
}

impl SourceBundle {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Attribute every source to `server`.
    #[must_use]
    pub fn labelled(mut self, server: &str) -> Self {
        for source in &mut self.sources {
            source.server = server.to_string();
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_detects_playlist() {
        assert!(Source::new("https://cdn.example/a/master.m3u8?t=1", "hd-1").is_playlist);
        assert!(!Source::new("https://cdn.example/a/video.mp4", "kwik").is_playlist);
    }

    #[test]
    fn test_normalize_quality() {
        assert_eq!(normalize_quality("1080"), "1080p");
        assert_eq!(normalize_quality("720P"), "720p");
        assert_eq!(normalize_quality("default"), "auto");
        assert_eq!(normalize_quality("1440p"), "auto");
    }

    #[test]
    fn test_time_range_requires_order() {
        assert!(TimeRange::new(10.0, 90.0).is_some());
        assert!(TimeRange::new(0.0, 0.0).is_none());
        assert!(TimeRange::new(90.0, 10.0).is_none());
    }

    #[test]
    fn test_source_serializes_camel_case() {
        let json = serde_json::to_value(Source::new("https://x/a.m3u8", "hd-1")).unwrap();
        assert_eq!(json["isPlaylist"], true);
        assert!(json.get("headers").is_none());
    }
}
