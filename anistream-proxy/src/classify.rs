//! Resource classification and content-type inference

use url::Url;

pub const PLAYLIST_CONTENT_TYPE: &str = "application/vnd.apple.mpegurl";
const SEGMENT_FALLBACK_CONTENT_TYPE: &str = "video/mp2t";
const OCTET_STREAM: &str = "application/octet-stream";

/// What a proxied URL points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Playlist,
    Segment,
    Subtitle,
    Image,
    Other,
}

/// Extensions some CDNs put on media segments to disguise them
const DISGUISED_SEGMENT_EXTENSIONS: [&str; 8] = ["html", "js", "css", "txt", "woff", "woff2", "ico", "bin"];

fn extension(url: &Url) -> Option<String> {
    let last = url.path_segments()?.next_back()?;
    let (_, ext) = last.rsplit_once('.')?;
    Some(ext.to_ascii_lowercase())
}

/// Classify by URL alone.
#[must_use]
pub fn classify_url(url: &Url) -> ResourceKind {
    match extension(url).as_deref() {
        Some("m3u8" | "m3u") => ResourceKind::Playlist,
        Some("vtt" | "srt" | "ass" | "ssa") => ResourceKind::Subtitle,
        Some("jpg" | "jpeg" | "png" | "gif" | "webp" | "avif") => ResourceKind::Image,
        Some("ts" | "m4s" | "mp4" | "m4v" | "aac" | "key") => ResourceKind::Segment,
        Some(ext) if DISGUISED_SEGMENT_EXTENSIONS.contains(&ext) => ResourceKind::Segment,
        _ => ResourceKind::Other,
    }
}

/// Refine a URL classification with the upstream `Content-Type`.
#[must_use]
pub fn classify(url: &Url, content_type: Option<&str>) -> ResourceKind {
    let by_url = classify_url(url);
    let Some(content_type) = content_type.map(str::to_ascii_lowercase) else {
        return by_url;
    };
    if content_type.contains("mpegurl") {
        ResourceKind::Playlist
    } else if content_type.starts_with("text/vtt") {
        ResourceKind::Subtitle
    } else if content_type.starts_with("image/") && by_url == ResourceKind::Other {
        ResourceKind::Image
    } else {
        by_url
    }
}

/// Upstream types that say nothing about the payload; CDNs send them for
/// subtitles and disguised segments alike.
const GENERIC_CONTENT_TYPES: [&str; 4] = ["application/octet-stream", "binary/octet-stream", "text/plain", "text/html"];

fn is_generic(content_type: &str) -> bool {
    let essence = content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    GENERIC_CONTENT_TYPES.contains(&essence.as_str())
}

fn inferred_content_type(url: &Url) -> Option<&'static str> {
    let inferred = match extension(url)?.as_str() {
        "m3u8" | "m3u" => PLAYLIST_CONTENT_TYPE,
        "vtt" => "text/vtt",
        "ass" | "ssa" | "srt" => "text/plain",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "ts" => SEGMENT_FALLBACK_CONTENT_TYPE,
        "mp4" | "m4v" => "video/mp4",
        "m4s" => "video/iso.segment",
        "aac" => "audio/aac",
        "key" => OCTET_STREAM,
        ext if DISGUISED_SEGMENT_EXTENSIONS.contains(&ext) => OCTET_STREAM,
        _ => return None,
    };
    Some(inferred)
}

/// Content type to answer with: a specific upstream header wins, then the
/// type implied by the URL extension, then whatever upstream sent.
#[must_use]
pub fn content_type_for(url: &Url, upstream: Option<&str>) -> String {
    let upstream = upstream.map(str::trim).filter(|s| !s.is_empty());
    if let Some(specific) = upstream.filter(|s| !is_generic(s)) {
        return specific.to_string();
    }
    inferred_content_type(url)
        .or(upstream)
        .unwrap_or(SEGMENT_FALLBACK_CONTENT_TYPE)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_classify_by_extension() {
        assert_eq!(classify_url(&url("https://cdn.example/a/index.m3u8?t=1")), ResourceKind::Playlist);
        assert_eq!(classify_url(&url("https://subs.example/eng-2.vtt")), ResourceKind::Subtitle);
        assert_eq!(classify_url(&url("https://img.example/thumb.JPG")), ResourceKind::Image);
        assert_eq!(classify_url(&url("https://cdn.example/seg-1-v1-a1.html")), ResourceKind::Segment);
        assert_eq!(classify_url(&url("https://cdn.example/stream")), ResourceKind::Other);
    }

    #[test]
    fn test_content_type_overrides_url() {
        let u = url("https://cdn.example/playlist?id=9");
        assert_eq!(classify(&u, Some("application/x-mpegURL")), ResourceKind::Playlist);
        assert_eq!(classify(&u, None), ResourceKind::Other);
        assert_eq!(classify(&url("https://img.example/poster"), Some("image/png")), ResourceKind::Image);
        assert_eq!(classify(&url("https://subs.example/track?id=2"), Some("text/vtt")), ResourceKind::Subtitle);
    }

    #[test]
    fn test_content_type_inference() {
        assert_eq!(content_type_for(&url("https://x.example/a.m3u8"), None), PLAYLIST_CONTENT_TYPE);
        assert_eq!(content_type_for(&url("https://x.example/a.vtt"), None), "text/vtt");
        assert_eq!(content_type_for(&url("https://x.example/a.srt"), None), "text/plain");
        assert_eq!(content_type_for(&url("https://x.example/a.webp"), None), "image/webp");
        assert_eq!(content_type_for(&url("https://x.example/seg.css"), None), OCTET_STREAM);
        assert_eq!(content_type_for(&url("https://x.example/seg"), None), "video/mp2t");
        assert_eq!(content_type_for(&url("https://x.example/seg.ts"), None), "video/mp2t");
    }

    #[test]
    fn test_generic_upstream_type_yields_to_extension() {
        assert_eq!(content_type_for(&url("https://x.example/a.vtt"), Some("text/plain; charset=utf-8")), "text/vtt");
        assert_eq!(content_type_for(&url("https://x.example/seg-1.html"), Some("text/html")), OCTET_STREAM);
        assert_eq!(content_type_for(&url("https://x.example/seg"), Some("application/octet-stream")), OCTET_STREAM);
        assert_eq!(content_type_for(&url("https://x.example/a.vtt"), Some("text/vtt; charset=utf-8")), "text/vtt; charset=utf-8");
        assert_eq!(content_type_for(&url("https://x.example/seg.ts"), Some("video/MP2T")), "video/MP2T");
    }
}
