//! Default source selection for clients that did not pick a quality.

use crate::models::Source;

/// Qualities in order of preference when no playlist is offered
const QUALITY_ORDER: [&str; 5] = ["1080p", "720p", "480p", "360p", "auto"];

/// Pick the source a client should play by default.
///
/// Playlists win outright since they adapt to bandwidth; otherwise the
/// best listed quality, otherwise the first source. `None` only for an
/// empty slice.
#[must_use]
pub fn pick_default(sources: &[Source]) -> Option<&Source> {
    if let Some(playlist) = sources.iter().find(|s| s.is_playlist) {
        return Some(playlist);
    }
    QUALITY_ORDER
        .iter()
        .find_map(|quality| sources.iter().find(|s| s.quality.eq_ignore_ascii_case(quality)))
        .or_else(|| sources.first())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(url: &str, quality: &str, is_playlist: bool) -> Source {
        Source {
            url: url.to_string(),
            quality: quality.to_string(),
            is_playlist,
            server: "hd-1".to_string(),
            headers: None,
        }
    }

    #[test]
    fn test_playlist_preferred() {
        let sources = vec![
            source("https://cdn.example/360.mp4", "360p", false),
            source("https://cdn.example/index.m3u8", "m3u8", true),
        ];
        assert_eq!(pick_default(&sources).unwrap().url, "https://cdn.example/index.m3u8");
    }

    #[test]
    fn test_best_quality_when_no_playlist() {
        let sources = vec![
            source("https://cdn.example/360.mp4", "360p", false),
            source("https://cdn.example/1080.mp4", "1080P", false),
            source("https://cdn.example/720.mp4", "720p", false),
        ];
        assert_eq!(pick_default(&sources).unwrap().url, "https://cdn.example/1080.mp4");
    }

    #[test]
    fn test_unknown_qualities_fall_back_to_first() {
        let sources = vec![
            source("https://cdn.example/a.mp4", "hd", false),
            source("https://cdn.example/b.mp4", "sd", false),
        ];
        assert_eq!(pick_default(&sources).unwrap().url, "https://cdn.example/a.mp4");
    }

    #[test]
    fn test_empty_input() {
        assert!(pick_default(&[]).is_none());
    }
}
