//! HLS playlist rewriting
//!
//! Every segment, variant and key URI in a playlist is pointed back through
//! the proxy so the player never talks to the upstream CDN directly.
//! Relative URIs are resolved against the playlist's own directory first.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use url::Url;

/// Characters left bare in a query value (RFC 3986 unreserved)
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

const KEY_TAG: &str = "#EXT-X-KEY";
const VARIANT_TAG: &str = "#EXT-X-STREAM-INF";
/// Path under the proxy base that always rewrites its target
const PLAYLIST_ROUTE: &str = "/m3u8";
const URI_ATTRIBUTE: &str = "URI=\"";

/// Percent-encode a value for use in a query string.
#[must_use]
pub fn encode_query_value(value: &str) -> String {
    utf8_percent_encode(value, QUERY_VALUE).to_string()
}

/// `<proxy_base>?url=<target>`, plus the referer when one is carried.
#[must_use]
pub fn proxy_url(proxy_base: &str, target: &str, referer: Option<&str>) -> String {
    let mut proxied = format!("{proxy_base}?url={}", encode_query_value(target));
    if let Some(referer) = referer {
        proxied.push_str("&referer=");
        proxied.push_str(&encode_query_value(referer));
    }
    proxied
}

/// Directory of the playlist: scheme, host and path up to the last `/`.
#[must_use]
pub fn base_path(playlist_url: &Url) -> Url {
    let mut base = playlist_url.clone();
    base.set_query(None);
    base.set_fragment(None);
    let dir_len = base.path().rfind('/').map_or(0, |i| i + 1);
    let dir = base.path()[..dir_len].to_string();
    base.set_path(if dir.is_empty() { "/" } else { &dir });
    base
}

/// Playlist rewriter bound to one playlist and one proxy
pub struct Rewriter<'a> {
    base: Url,
    proxy_base: &'a str,
    playlist_base: String,
    referer: Option<&'a str>,
}

impl<'a> Rewriter<'a> {
    #[must_use]
    pub fn new(playlist_url: &Url, proxy_base: &'a str, referer: Option<&'a str>) -> Self {
        Self {
            base: base_path(playlist_url),
            proxy_base,
            playlist_base: format!("{proxy_base}{PLAYLIST_ROUTE}"),
            referer,
        }
    }

    /// Already pointed at one of the proxy routes, not merely sharing a
    /// prefix with them.
    fn is_proxied(&self, uri: &str) -> bool {
        uri.strip_prefix(self.proxy_base)
            .map(|rest| rest.strip_prefix(PLAYLIST_ROUTE).unwrap_or(rest))
            .is_some_and(|query| query.starts_with('?'))
    }

    fn resolve(&self, raw: &str) -> Option<String> {
        if raw.starts_with("http://") || raw.starts_with("https://") {
            return Some(raw.to_string());
        }
        self.base.join(raw).ok().map(String::from)
    }

    /// Proxy URL for `raw`, or `None` when it must be left alone. Variant
    /// playlists go through the playlist route so they are rewritten
    /// whatever their extension or upstream content type.
    fn rewrite_uri(&self, raw: &str, variant: bool) -> Option<String> {
        if self.is_proxied(raw) {
            return None;
        }
        let route = if variant { self.playlist_base.as_str() } else { self.proxy_base };
        self.resolve(raw)
            .map(|absolute| proxy_url(route, &absolute, self.referer))
    }

    /// Rewrite the `URI="..."` attribute of a key line; every other
    /// attribute is kept verbatim.
    fn rewrite_key_line(&self, line: &str) -> String {
        let Some(start) = line.find(URI_ATTRIBUTE) else {
            return line.to_string();
        };
        let value_start = start + URI_ATTRIBUTE.len();
        let Some(value_len) = line[value_start..].find('"') else {
            return line.to_string();
        };
        let uri = &line[value_start..value_start + value_len];
        match self.rewrite_uri(uri, false) {
            Some(proxied) => format!(
                "{}{proxied}{}",
                &line[..value_start],
                &line[value_start + value_len..]
            ),
            None => line.to_string(),
        }
    }

    /// `variant` is set when the previous tag announced a variant stream.
    fn rewrite_line(&self, line: &str, variant: bool) -> String {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return line.to_string();
        }
        if trimmed.starts_with(KEY_TAG) {
            return self.rewrite_key_line(line);
        }
        if trimmed.starts_with('#') {
            return line.to_string();
        }
        self.rewrite_uri(trimmed, variant).unwrap_or_else(|| line.to_string())
    }

    /// Rewrite a whole playlist, keeping line order and the original line
    /// separator.
    #[must_use]
    pub fn rewrite(&self, playlist: &str) -> String {
        let separator = if playlist.contains("\r\n") { "\r\n" } else { "\n" };
        let mut in_variant = false;
        playlist
            .split(separator)
            .map(|line| {
                let trimmed = line.trim();
                let out = self.rewrite_line(line, in_variant);
                if trimmed.starts_with(VARIANT_TAG) {
                    in_variant = true;
                } else if !trimmed.is_empty() && !trimmed.starts_with('#') {
                    in_variant = false;
                }
                out
            })
            .collect::<Vec<_>>()
            .join(separator)
    }
}

/// Rewrite `playlist`, fetched from `playlist_url`, to route through
/// `proxy_base`.
#[must_use]
pub fn rewrite_playlist(playlist: &str, playlist_url: &Url, proxy_base: &str, referer: Option<&str>) -> String {
    Rewriter::new(playlist_url, proxy_base, referer).rewrite(playlist)
}
