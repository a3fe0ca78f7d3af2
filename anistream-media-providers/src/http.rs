//! Shared HTTP plumbing for upstream clients

use std::time::Duration;

use reqwest::Client;

use crate::error::ProviderClientError;

/// Desktop browser User-Agent presented to scraping targets.
pub const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Connect timeout applied to every upstream client.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Build a pooled client with the browser User-Agent and the given
/// per-request timeout.
pub fn build_client(timeout: Duration) -> Result<Client, ProviderClientError> {
    Client::builder()
        .user_agent(DESKTOP_USER_AGENT)
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(timeout)
        .pool_max_idle_per_host(10)
        .cookie_store(true)
        .build()
        .map_err(|e| ProviderClientError::InvalidConfig(format!("Failed to build HTTP client: {e}")))
}

/// Join a base URL and a path without doubling or dropping slashes.
#[must_use]
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Turn protocol-relative or site-relative links into absolute URLs.
#[must_use]
pub fn absolutize(base: &str, link: &str) -> String {
    let link = link.trim();
    if link.starts_with("http://") || link.starts_with("https://") {
        link.to_string()
    } else if let Some(rest) = link.strip_prefix("//") {
        format!("https://{rest}")
    } else {
        join_url(base, link)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("https://a.example/", "/x/y"), "https://a.example/x/y");
        assert_eq!(join_url("https://a.example", "x"), "https://a.example/x");
    }

    #[test]
    fn test_absolutize() {
        assert_eq!(
            absolutize("https://a.example", "//cdn.example/e/1"),
            "https://cdn.example/e/1"
        );
        assert_eq!(
            absolutize("https://a.example", "/watch/x"),
            "https://a.example/watch/x"
        );
        assert_eq!(
            absolutize("https://a.example", " https://b.example/z "),
            "https://b.example/z"
        );
    }
}
