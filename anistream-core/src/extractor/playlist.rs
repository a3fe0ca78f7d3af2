//! HLS master playlist parsing

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

static RESOLUTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"RESOLUTION=(\d+)x(\d+)").expect("invalid regex"));
static BANDWIDTH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[:,])BANDWIDTH=(\d+)").expect("invalid regex"));

const STREAM_INF: &str = "#EXT-X-STREAM-INF";

/// One rendition listed by a master playlist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    /// Absolute URI of the media playlist
    pub uri: String,
    pub height: Option<u32>,
    pub bandwidth: Option<u64>,
}

impl Variant {
    /// `<height>p`, or `auto` when the playlist gave no resolution
    #[must_use]
    pub fn quality(&self) -> String {
        self.height
            .map_or_else(|| crate::models::QUALITY_AUTO.to_string(), |h| format!("{h}p"))
    }
}

#[must_use]
pub fn is_master(text: &str) -> bool {
    text.contains(STREAM_INF)
}

/// Variants of a master playlist, URIs resolved against `base`.
#[must_use]
pub fn parse_master(text: &str, base: &Url) -> Vec<Variant> {
    let mut variants = Vec::new();
    let mut pending: Option<(Option<u32>, Option<u64>)> = None;

    for line in text.lines().map(str::trim) {
        if line.starts_with(STREAM_INF) {
            let height = RESOLUTION
                .captures(line)
                .and_then(|c| c.get(2)?.as_str().parse().ok());
            let bandwidth = BANDWIDTH
                .captures(line)
                .and_then(|c| c.get(1)?.as_str().parse().ok());
            pending = Some((height, bandwidth));
        } else if line.is_empty() || line.starts_with('#') {
            continue;
        } else if let Some((height, bandwidth)) = pending.take() {
            if let Ok(uri) = base.join(line) {
                variants.push(Variant {
                    uri: uri.to_string(),
                    height,
                    bandwidth,
                });
            }
        }
    }

    variants
}

#[cfg(test)]
mod tests {
    use super::*;

    const MASTER: &str = "#EXTM3U\n\
        #EXT-X-STREAM-INF:PROGRAM-ID=1,BANDWIDTH=2500000,RESOLUTION=1920x1080,NAME=\"1080p\"\n\
        ep.1.1080.m3u8\n\
        #EXT-X-STREAM-INF:PROGRAM-ID=1,BANDWIDTH=800000,RESOLUTION=854x480\n\
        https://cdn2.example/hls/ep.1.480.m3u8\n\
        #EXT-X-STREAM-INF:BANDWIDTH=100000\n\
        audio.m3u8\n";

    #[test]
    fn test_parse_master_resolves_and_labels() {
        let base = Url::parse("https://cdn.example/hls/abc/master.m3u8").unwrap();
        assert!(is_master(MASTER));
        let variants = parse_master(MASTER, &base);
        assert_eq!(variants.len(), 3);
        assert_eq!(variants[0].uri, "https://cdn.example/hls/abc/ep.1.1080.m3u8");
        assert_eq!(variants[0].quality(), "1080p");
        assert_eq!(variants[0].bandwidth, Some(2_500_000));
        assert_eq!(variants[1].uri, "https://cdn2.example/hls/ep.1.480.m3u8");
        assert_eq!(variants[1].quality(), "480p");
        assert_eq!(variants[2].quality(), "auto");
    }

    #[test]
    fn test_media_playlist_is_not_master() {
        assert!(!is_master("#EXTM3U\n#EXTINF:10,\nseg1.ts\n"));
    }
}
