//! Cache key construction
//!
//! Keys are plain strings so a log line shows exactly what was looked up.

use crate::models::{Category, EpisodeRef, ProviderKind};

/// Marker used in place of an absent server preference
pub const DEFAULT_SERVER: &str = "default";

/// `sources:<episode>:<server|default>:<category>:<fallback>`
#[must_use]
pub fn sources_key(
    episode: &EpisodeRef,
    server: Option<&str>,
    category: Category,
    allow_fallback: bool,
) -> String {
    let server = server
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_SERVER.to_string());
    format!("sources:{episode}:{server}:{category}:{allow_fallback}")
}

/// `search:<provider>:<normalized query>`; queries differing only in case
/// or spacing share a key.
#[must_use]
pub fn search_key(provider: ProviderKind, query: &str) -> String {
    let normalized = query
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ");
    format!("search:{provider}:{normalized}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sources_key() {
        let ep = EpisodeRef::parse("naruto-100?ep=1").unwrap();
        assert_eq!(
            sources_key(&ep, Some("HD-1"), Category::Sub, true),
            "sources:naruto-100?ep=1:hd-1:sub:true"
        );
        assert_eq!(
            sources_key(&ep, None, Category::Dub, false),
            "sources:naruto-100?ep=1:default:dub:false"
        );
        assert_eq!(sources_key(&ep, Some(" "), Category::Dub, false), sources_key(&ep, None, Category::Dub, false));
    }

    #[test]
    fn test_search_key_normalizes_query() {
        assert_eq!(
            search_key(ProviderKind::OfficialApi, "  One   PIECE "),
            "search:official_api:one piece"
        );
    }
}
