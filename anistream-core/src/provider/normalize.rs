//! Anime ID normalization
//!
//! Upstream slugs sometimes carry a numeric disambiguation suffix
//! (`show-title-20409`) and sometimes do not. Lookups that 404 retry with
//! the other form, and episode filtering accepts either form.

use std::future::Future;
use std::sync::LazyLock;

use regex::Regex;

use super::ProviderError;

static NUMERIC_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-\d{3,}$").expect("invalid regex"));

/// Suffixes guessed when nothing principled finds the anime.
pub const HEURISTIC_SUFFIXES: [&str; 3] = ["-100", "-1", "-2"];

#[must_use]
pub fn has_numeric_suffix(id: &str) -> bool {
    NUMERIC_SUFFIX.is_match(id)
}

/// `show-title-20409` → `show-title`; ids without a suffix are unchanged.
#[must_use]
pub fn strip_numeric_suffix(id: &str) -> &str {
    NUMERIC_SUFFIX
        .find(id)
        .map_or(id, |m| &id[..m.start()])
}

/// Whether an anime id found upstream refers to the requested one: equal
/// case-insensitively, or equal once the suffix is stripped from the one
/// side that carries it. Two different suffixes name two different shows.
#[must_use]
pub fn ids_match(found: &str, requested: &str) -> bool {
    if found.eq_ignore_ascii_case(requested) {
        return true;
    }
    match (has_numeric_suffix(found), has_numeric_suffix(requested)) {
        (true, false) => strip_numeric_suffix(found).eq_ignore_ascii_case(requested),
        (false, true) => found.eq_ignore_ascii_case(strip_numeric_suffix(requested)),
        _ => false,
    }
}

/// Lowercase hyphenated slug of a title (`"Naruto: Shippuden"` → `naruto-shippuden`).
#[must_use]
pub fn slugify(title: &str) -> String {
    title
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Search query recovered from a slug (`one-piece-100` → `one piece`).
#[must_use]
pub fn title_query_from_slug(id: &str) -> String {
    strip_numeric_suffix(id).replace(['-', '_', '.'], " ").trim().to_string()
}

/// Look `anime_id` up, retrying on `NotFound` with the alternate id forms
/// in this order:
///
/// 1. the id as given;
/// 2. the suffix-stripped id, when it carries a suffix;
/// 3. for unsuffixed ids, the id `discover` finds (usually via search);
/// 4. the heuristic suffixes as a last resort.
///
/// Any error other than `NotFound` ends the walk. Returns the id that
/// resolved together with the value.
pub async fn lookup_with_id_fallback<T, L, LFut, D, DFut>(
    anime_id: &str,
    lookup: L,
    discover: D,
) -> Result<(String, T), ProviderError>
where
    L: Fn(String) -> LFut,
    LFut: Future<Output = Result<T, ProviderError>>,
    D: FnOnce() -> DFut,
    DFut: Future<Output = Option<String>>,
{
    let mut tried: Vec<String> = Vec::new();

    let mut principled = vec![anime_id.to_string()];
    if has_numeric_suffix(anime_id) {
        principled.push(strip_numeric_suffix(anime_id).to_string());
    }
    for id in principled {
        if let Some(found) = try_id(&lookup, &mut tried, id).await? {
            return Ok(found);
        }
    }

    if !has_numeric_suffix(anime_id) {
        if let Some(discovered) = discover().await {
            if let Some(found) = try_id(&lookup, &mut tried, discovered).await? {
                return Ok(found);
            }
        }
        for suffix in HEURISTIC_SUFFIXES {
            if let Some(found) = try_id(&lookup, &mut tried, format!("{anime_id}{suffix}")).await? {
                tracing::debug!(anime_id, resolved = %found.0, "Resolved anime id by guessed suffix");
                return Ok(found);
            }
        }
    }

    Err(ProviderError::NotFound(format!(
        "{anime_id} (tried {})",
        tried.join(", ")
    )))
}

async fn try_id<T, L, LFut>(
    lookup: &L,
    tried: &mut Vec<String>,
    id: String,
) -> Result<Option<(String, T)>, ProviderError>
where
    L: Fn(String) -> LFut,
    LFut: Future<Output = Result<T, ProviderError>>,
{
    if tried.contains(&id) {
        return Ok(None);
    }
    tried.push(id.clone());
    match lookup(id.clone()).await {
        Ok(value) => Ok(Some((id, value))),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_strip_numeric_suffix() {
        assert_eq!(strip_numeric_suffix("show-title-20409"), "show-title");
        assert_eq!(strip_numeric_suffix("naruto-677"), "naruto");
        assert_eq!(strip_numeric_suffix("mob-psycho-100"), "mob-psycho");
        assert_eq!(strip_numeric_suffix("season-2"), "season-2");
        assert!(!has_numeric_suffix("show-title"));
    }

    #[test]
    fn test_ids_match() {
        assert!(ids_match("show-title", "show-title-20409"));
        assert!(ids_match("Show-Title-20409", "show-title"));
        assert!(ids_match("naruto-677", "naruto-677"));
        assert!(!ids_match("boruto-8143", "naruto-677"));
        assert!(!ids_match("x-20409", "x-11111"));
        assert!(ids_match("X-20409", "x-20409"));
    }

    #[test]
    fn test_slug_helpers() {
        assert_eq!(slugify("Naruto: Shippuden"), "naruto-shippuden");
        assert_eq!(slugify("  Re:ZERO -Starting Life-  "), "re-zero-starting-life");
        assert_eq!(title_query_from_slug("one-piece-100"), "one piece");
    }

    #[tokio::test]
    async fn test_suffixed_lookup_retries_stripped() {
        let calls = Mutex::new(Vec::new());
        let result = lookup_with_id_fallback(
            "show-title-20409",
            |id| {
                calls.lock().unwrap().push(id.clone());
                async move {
                    if id == "show-title" {
                        Ok(7)
                    } else {
                        Err(ProviderError::NotFound(id))
                    }
                }
            },
            || async { None },
        )
        .await
        .unwrap();

        assert_eq!(result, ("show-title".to_string(), 7));
        assert_eq!(*calls.lock().unwrap(), vec!["show-title-20409", "show-title"]);
    }

    #[tokio::test]
    async fn test_unsuffixed_lookup_uses_discovery_then_heuristics() {
        let discovered = lookup_with_id_fallback(
            "show-title",
            |id| async move {
                if id == "show-title-20409" { Ok(()) } else { Err(ProviderError::NotFound(id)) }
            },
            || async { Some("show-title-20409".to_string()) },
        )
        .await
        .unwrap();
        assert_eq!(discovered.0, "show-title-20409");

        let guessed = lookup_with_id_fallback(
            "show-title",
            |id| async move {
                if id == "show-title-1" { Ok(()) } else { Err(ProviderError::NotFound(id)) }
            },
            || async { None },
        )
        .await
        .unwrap();
        assert_eq!(guessed.0, "show-title-1");
    }

    #[tokio::test]
    async fn test_non_not_found_error_stops_walk() {
        let calls = Mutex::new(0);
        let err = lookup_with_id_fallback(
            "show-title-20409",
            |_| {
                *calls.lock().unwrap() += 1;
                async { Err::<(), _>(ProviderError::UpstreamBlocked("403".into())) }
            },
            || async { None },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ProviderError::UpstreamBlocked(_)));
        assert_eq!(*calls.lock().unwrap(), 1);
    }
}
