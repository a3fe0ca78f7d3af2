//! Symmetric-cipher embed (gogo CDN family)
//!
//! The embed page carries an AES-CBC encrypted, base64 encoded payload.
//! Decrypting it with the site's fixed key/IV yields a query string (or a
//! small JSON document) naming the HLS playlist. Master playlists are
//! expanded into one source per variant.

use std::collections::HashMap;
use std::sync::LazyLock;

use aes::{Aes128, Aes192, Aes256};
use anistream_media_providers::error::{check_response, text_with_limit};
use anistream_media_providers::scrape::{attr, first_non_empty, Strategy};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, KeyIvInit};
use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};
use url::Url;

use super::playlist::{is_master, parse_master};
use super::Extractor;
use crate::models::{Source, SourceBundle};
use crate::provider::ProviderError;

static EPISODE_SCRIPT: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("script[data-name=\"episode\"][data-value]").expect("invalid selector")
});
static ANY_DATA_VALUE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("[data-value]").expect("invalid selector"));
static INLINE_PAYLOAD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:data-value|episode|crypto|payload)["']?\s*[:=]\s*["']([A-Za-z0-9+/]{16,}={0,2})["']"#)
        .expect("invalid regex")
});
static PLAYLIST_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s"'<>&]+\.m3u8[^\s"'<>&]*"#).expect("invalid regex"));

const HOST_MARKERS: [&str; 7] = [
    "gogo", "embtaku", "goload", "playtaku", "anihdplay", "gotaku", "playgo",
];
const PATH_MARKERS: [&str; 3] = ["streaming.php", "embedplus", "load.php"];
const QUERY_URL_KEYS: [&str; 4] = ["file", "source", "url", "playlist"];

/// AES-CBC key material, UTF-8 bytes
#[derive(Debug, Clone)]
pub struct GogoCipher {
    key: Vec<u8>,
    iv: Vec<u8>,
}

impl GogoCipher {
    /// Key must be 16, 24 or 32 bytes; IV 16 bytes.
    pub fn new(key: &str, iv: &str) -> Result<Self, ProviderError> {
        if !matches!(key.len(), 16 | 24 | 32) || iv.len() != 16 {
            return Err(ProviderError::MalformedInput(format!(
                "AES key must be 16/24/32 bytes and IV 16 bytes (got {}/{})",
                key.len(),
                iv.len()
            )));
        }
        Ok(Self {
            key: key.as_bytes().to_vec(),
            iv: iv.as_bytes().to_vec(),
        })
    }

    /// Base64-decode and decrypt a payload into UTF-8 text.
    pub fn decrypt(&self, payload: &str) -> Result<String, ProviderError> {
        let ciphertext = STANDARD
            .decode(payload.trim())
            .map_err(|e| ProviderError::DecryptionFailure(format!("payload is not base64: {e}")))?;

        let plain = decrypt_with(&self.key, &self.iv, &ciphertext)?;

        String::from_utf8(plain)
            .map_err(|_| ProviderError::DecryptionFailure("plaintext is not UTF-8".to_string()))
    }
}

macro_rules! cbc_decrypt {
    ($cipher:ty, $key:expr, $iv:expr, $data:expr) => {
        cbc::Decryptor::<$cipher>::new_from_slices($key, $iv)
            .map_err(|e| ProviderError::DecryptionFailure(format!("bad key material: {e}")))?
            .decrypt_padded_vec_mut::<Pkcs7>($data)
            .map_err(|_| ProviderError::DecryptionFailure("bad padding, key likely rotated".to_string()))
    };
}

fn decrypt_with(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, ProviderError> {
    match key.len() {
        16 => cbc_decrypt!(Aes128, key, iv, ciphertext),
        24 => cbc_decrypt!(Aes192, key, iv, ciphertext),
        _ => cbc_decrypt!(Aes256, key, iv, ciphertext),
    }
}

/// Extractor for gogo CDN embeds
pub struct GogoCdnExtractor {
    client: Client,
    cipher: GogoCipher,
}

impl GogoCdnExtractor {
    #[must_use]
    pub const fn new(client: Client, cipher: GogoCipher) -> Self {
        Self { client, cipher }
    }

    async fn fetch_text(&self, url: &str, referer: &str) -> Result<String, ProviderError> {
        let resp = self
            .client
            .get(url)
            .header("Referer", referer)
            .send()
            .await
            .map_err(anistream_media_providers::ProviderClientError::from)?;
        Ok(text_with_limit(check_response(resp)?).await?)
    }
}

#[async_trait]
impl Extractor for GogoCdnExtractor {
    fn name(&self) -> &'static str {
        "gogocdn"
    }

    fn matches(&self, url: &Url) -> bool {
        let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
        HOST_MARKERS.iter().any(|m| host.contains(m))
            || PATH_MARKERS.iter().any(|m| url.path().contains(m))
    }

    async fn try_extract(&self, embed_url: &Url) -> Result<SourceBundle, ProviderError> {
        let referer = format!("{}/", embed_url.origin().ascii_serialization());
        let page = self.fetch_text(embed_url.as_str(), &referer).await?;

        let payload = find_payload(&page)
            .ok_or_else(|| ProviderError::ExtractionFailure("no encrypted payload on embed page".to_string()))?;
        let plain = self.cipher.decrypt(&payload)?;
        let playlist_url = playlist_from_plaintext(&plain, embed_url).ok_or_else(|| {
            ProviderError::ExtractionFailure("decrypted payload names no playlist".to_string())
        })?;

        let playlist = self.fetch_text(playlist_url.as_str(), &referer).await?;
        let headers = HashMap::from([("Referer".to_string(), referer)]);
        Ok(SourceBundle {
            sources: sources_from_playlist(&playlist, &playlist_url, self.name()),
            headers,
            ..SourceBundle::default()
        })
    }
}

fn payload_from_episode_script(doc: &Html) -> Vec<String> {
    doc.select(&EPISODE_SCRIPT)
        .filter_map(|el| attr(&el, "data-value"))
        .collect()
}

fn payload_from_any_attribute(doc: &Html) -> Vec<String> {
    doc.select(&ANY_DATA_VALUE)
        .filter_map(|el| attr(&el, "data-value"))
        .collect()
}

fn payload_from_inline_script(doc: &Html) -> Vec<String> {
    let html = doc.html();
    INLINE_PAYLOAD
        .captures_iter(&html)
        .filter_map(|c| Some(c.get(1)?.as_str().to_string()))
        .collect()
}

/// Locate the encrypted payload on an embed page.
pub(crate) fn find_payload(page: &str) -> Option<String> {
    let doc = Html::parse_document(page);
    let strategies: [Strategy<String>; 3] = [
        ("episode-script", payload_from_episode_script),
        ("data-value", payload_from_any_attribute),
        ("inline-script", payload_from_inline_script),
    ];
    first_non_empty(&doc, &strategies, |v| {
        v.len() >= 16 && v.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '='))
    })
    .into_iter()
    .next()
}

/// Playlist URL named by a decrypted payload: a JSON `file` field, a
/// URL-valued query parameter, or any `.m3u8` URL in the text.
pub(crate) fn playlist_from_plaintext(plain: &str, embed_url: &Url) -> Option<Url> {
    let plain = plain.trim();

    if plain.starts_with('{') {
        if let Ok(json) = serde_json::from_str::<serde_json::Value>(plain) {
            let file = ["source", "source_bk"]
                .iter()
                .filter_map(|k| json.get(*k)?.as_array())
                .flatten()
                .find_map(|s| s.get("file")?.as_str());
            if let Some(file) = file {
                return embed_url.join(file).ok();
            }
        }
    }

    let query = plain.trim_start_matches('?');
    let from_query = url::form_urlencoded::parse(query.as_bytes())
        .find(|(k, v)| {
            QUERY_URL_KEYS.contains(&k.as_ref()) || (v.starts_with("http") && v.contains(".m3u8"))
        })
        .map(|(_, v)| v.into_owned())
        .filter(|v| v.starts_with("http") || v.starts_with('/'));
    if let Some(found) = from_query {
        return embed_url.join(&found).ok();
    }

    PLAYLIST_URL
        .find(plain)
        .and_then(|m| Url::parse(m.as_str()).ok())
}

fn sources_from_playlist(text: &str, playlist_url: &Url, server: &str) -> Vec<Source> {
    if is_master(text) {
        let variants = parse_master(text, playlist_url);
        if !variants.is_empty() {
            return variants
                .into_iter()
                .map(|v| {
                    let quality = v.quality();
                    let mut source = Source::new(v.uri, server).with_playlist(true);
                    source.quality = quality;
                    source
                })
                .collect();
        }
    }
    vec![Source::new(playlist_url.as_str(), server).with_playlist(true)]
}
