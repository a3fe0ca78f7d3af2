//! HTML scraping helpers
//!
//! Selector fallbacks are expressed as ordered lists of pure strategies.
//! Each strategy parses the same document; the first one producing a
//! non-empty, validated result wins.

use scraper::{ElementRef, Html};

/// A named, pure extraction strategy over a parsed document.
pub type Strategy<T> = (&'static str, fn(&Html) -> Vec<T>);

/// Apply `strategies` in order and return the first non-empty result set
/// after `validate` has filtered it.
pub fn first_non_empty<T>(
    doc: &Html,
    strategies: &[Strategy<T>],
    validate: impl Fn(&T) -> bool,
) -> Vec<T> {
    for (name, strategy) in strategies {
        let found: Vec<T> = strategy(doc).into_iter().filter(|item| validate(item)).collect();
        if !found.is_empty() {
            tracing::trace!(strategy = name, count = found.len(), "Scrape strategy matched");
            return found;
        }
    }
    Vec::new()
}

/// Collapsed, trimmed text content of an element.
#[must_use]
pub fn element_text(el: &ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Non-empty trimmed attribute value.
#[must_use]
pub fn attr(el: &ElementRef<'_>, name: &str) -> Option<String> {
    el.value()
        .attr(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}

/// Pull the last run of ASCII digits out of a label such as `"EP 12"`.
#[must_use]
pub fn trailing_number(text: &str) -> Option<u32> {
    let digits: String = text
        .trim()
        .chars()
        .rev()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(char::is_ascii_digit)
        .collect();
    digits.chars().rev().collect::<String>().parse().ok()
}
