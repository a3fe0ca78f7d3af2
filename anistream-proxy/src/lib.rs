//! Media proxy
//!
//! Fetches playlists, segments, subtitles and images from upstream CDNs with
//! spoofed headers chosen by destination host, rewriting playlists so every
//! nested reference comes back through the proxy. Used by the `/proxy`
//! routes in `anistream-api`.

pub mod classify;
pub mod error;
pub mod headers;
pub mod rewrite;
pub mod wrap;

use std::time::Duration;

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use reqwest::header::{HeaderMap, CONTENT_RANGE, CONTENT_TYPE};
use url::Url;

pub use classify::ResourceKind;
pub use error::ProxyError;
pub use wrap::wrap_bundle;

use classify::{classify, classify_url, content_type_for, PLAYLIST_CONTENT_TYPE};
use headers::{minimal_headers, spoofed_headers};
use rewrite::Rewriter;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// One proxied fetch
#[derive(Debug, Clone, Copy, Default)]
pub struct ProxyRequest<'a> {
    pub url: &'a str,
    /// Client `Range` header, forwarded unchanged
    pub range: Option<&'a str>,
    /// Referer the embed page demanded, overriding the host table
    pub referer: Option<&'a str>,
    /// Treat the response as a playlist whatever its URL or content type
    pub expect_playlist: bool,
}

#[derive(Debug)]
pub enum ProxyBody {
    /// Rewritten playlist text
    Playlist(String),
    /// Upstream bytes, streamed through untouched
    Stream(reqwest::Response),
}

#[derive(Debug)]
pub struct ProxyResponse {
    pub status: StatusCode,
    pub kind: ResourceKind,
    pub content_type: String,
    pub content_length: Option<u64>,
    pub content_range: Option<String>,
    pub body: ProxyBody,
}

/// Stateless proxy; clones share one connection pool.
#[derive(Clone, Debug)]
pub struct ProxyService {
    client: reqwest::Client,
    proxy_base: String,
    max_playlist_bytes: usize,
}

impl ProxyService {
    /// `public_base_url` is where clients reach this server; rewritten
    /// playlists point at `<public_base_url>/proxy`.
    pub fn new(public_base_url: &str, timeout: Duration, max_playlist_bytes: usize) -> Result<Self, ProxyError> {
        // Bodies must pass through byte-for-byte so Content-Length and
        // Content-Range stay truthful.
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(timeout)
            .no_gzip()
            .build()?;
        Ok(Self {
            client,
            proxy_base: format!("{}/proxy", public_base_url.trim_end_matches('/')),
            max_playlist_bytes,
        })
    }

    #[must_use]
    pub fn proxy_base(&self) -> &str {
        &self.proxy_base
    }

    /// Fetch `request.url`, rewriting it when it turns out to be a playlist.
    pub async fn fetch(&self, request: ProxyRequest<'_>) -> Result<ProxyResponse, ProxyError> {
        let url = parse_target(request.url)?;
        let by_url = classify_url(&url);
        // A playlist is rewritten whole, so a byte range of it is useless.
        let range = if request.expect_playlist || by_url == ResourceKind::Playlist {
            None
        } else {
            request.range
        };

        let mut response = self.upstream(&url, by_url, range, request.referer).await?;
        let upstream_type = header_string(response.headers(), &CONTENT_TYPE);
        let kind = if request.expect_playlist {
            ResourceKind::Playlist
        } else {
            classify(&url, upstream_type.as_deref())
        };
        tracing::debug!(url = %url, kind = ?kind, status = %response.status(), "Proxying upstream response");

        if kind == ResourceKind::Playlist {
            if response.status() == StatusCode::PARTIAL_CONTENT {
                tracing::debug!(url = %url, "Playlist answered with a range, fetching it whole");
                response = self.upstream(&url, by_url, None, request.referer).await?;
            }
            let text = self.read_playlist(response).await?;
            if text.trim_start().starts_with("#EXTM3U") {
                let rewritten = Rewriter::new(&url, &self.proxy_base, request.referer).rewrite(&text);
                return Ok(ProxyResponse {
                    status: StatusCode::OK,
                    kind,
                    content_type: PLAYLIST_CONTENT_TYPE.to_string(),
                    content_length: Some(rewritten.len() as u64),
                    content_range: None,
                    body: ProxyBody::Playlist(rewritten),
                });
            }
            tracing::debug!(url = %url, "Not an HLS playlist, passing through unchanged");
            return Ok(ProxyResponse {
                status: StatusCode::OK,
                kind: ResourceKind::Other,
                content_type: content_type_for(&url, upstream_type.as_deref()),
                content_length: Some(text.len() as u64),
                content_range: None,
                body: ProxyBody::Playlist(text),
            });
        }

        Ok(ProxyResponse {
            status: response.status(),
            kind,
            content_type: content_type_for(&url, upstream_type.as_deref()),
            content_length: response.content_length(),
            content_range: header_string(response.headers(), &CONTENT_RANGE),
            body: ProxyBody::Stream(response),
        })
    }

    async fn upstream(
        &self,
        url: &Url,
        by_url: ResourceKind,
        range: Option<&str>,
        referer: Option<&str>,
    ) -> Result<reqwest::Response, ProxyError> {
        if by_url == ResourceKind::Subtitle {
            return self.fetch_subtitle(url, range, referer).await;
        }
        ensure_success(self.send(url, spoofed_headers(url, referer, range)).await?).await
    }

    async fn send(&self, url: &Url, headers: HeaderMap) -> Result<reqwest::Response, ProxyError> {
        Ok(self.client.get(url.clone()).headers(headers).send().await?)
    }

    /// Subtitle CDNs often reject the full header bundle video hosts want,
    /// so a failed first attempt is retried once with bare headers.
    async fn fetch_subtitle(
        &self,
        url: &Url,
        range: Option<&str>,
        referer: Option<&str>,
    ) -> Result<reqwest::Response, ProxyError> {
        match self.send(url, spoofed_headers(url, referer, range)).await {
            Ok(response) if !is_error_status(&response) => return Ok(response),
            Ok(response) => {
                tracing::debug!(url = %url, status = %response.status(), "Subtitle fetch rejected, retrying with minimal headers");
            }
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "Subtitle fetch failed, retrying with minimal headers");
            }
        }
        ensure_success(self.send(url, minimal_headers(range)).await?).await
    }

    async fn read_playlist(&self, mut response: reqwest::Response) -> Result<String, ProxyError> {
        let limit = self.max_playlist_bytes;
        if response.content_length().is_some_and(|len| len > limit as u64) {
            return Err(ProxyError::TooLarge { limit });
        }
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if body.len() + chunk.len() > limit {
                return Err(ProxyError::TooLarge { limit });
            }
            body.extend_from_slice(&chunk);
        }
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

fn parse_target(raw: &str) -> Result<Url, ProxyError> {
    let url = Url::parse(raw.trim()).map_err(|e| ProxyError::InvalidUrl(format!("{raw}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ProxyError::InvalidUrl(format!("unsupported scheme in {raw}")));
    }
    Ok(url)
}

fn is_error_status(response: &reqwest::Response) -> bool {
    response.status().as_u16() >= 400
}

fn header_string(headers: &HeaderMap, name: &reqwest::header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

/// Turn an upstream error status into a [`ProxyError`], keeping a slice of
/// the body for diagnostics.
async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ProxyError> {
    if !is_error_status(&response) {
        return Ok(response);
    }
    let status = response.status();
    let url = response.url().to_string();
    let body = error_body_prefix(response).await;
    tracing::warn!(url = %url, status = status.as_u16(), "Upstream rejected proxied request");
    Err(ProxyError::from_status(
        status.as_u16(),
        status.canonical_reason().unwrap_or("error"),
        &body,
    ))
}

/// At most a little over [`error::MAX_ERROR_BODY`] bytes of an error body;
/// the rest is never downloaded.
async fn error_body_prefix(mut response: reqwest::Response) -> String {
    // one extra byte tells `from_status` the body was cut
    let limit = error::MAX_ERROR_BODY + 1;
    let mut body = Vec::with_capacity(limit);
    while body.len() < limit {
        match response.chunk().await {
            Ok(Some(chunk)) => {
                let take = chunk.len().min(limit - body.len());
                body.extend_from_slice(&chunk[..take]);
            }
            Ok(None) | Err(_) => break,
        }
    }
    String::from_utf8_lossy(&body).into_owned()
}

impl IntoResponse for ProxyResponse {
    fn into_response(self) -> Response {
        let mut builder = Response::builder()
            .status(self.status)
            .header(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")
            .header(header::ACCEPT_RANGES, "bytes");

        if let Ok(content_type) = HeaderValue::from_str(&self.content_type) {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        if let Some(length) = self.content_length {
            builder = builder.header(header::CONTENT_LENGTH, length);
        }
        if let Some(range) = self.content_range.as_deref().and_then(|r| HeaderValue::from_str(r).ok()) {
            builder = builder.header(header::CONTENT_RANGE, range);
        }

        let body = match self.body {
            ProxyBody::Playlist(text) => {
                builder = builder.header(header::CACHE_CONTROL, "no-cache");
                Body::from(text)
            }
            ProxyBody::Stream(response) => Body::from_stream(response.bytes_stream()),
        };

        builder
            .body(body)
            .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
    }
}

/// Preflight handler suitable for `OPTIONS` routes.
#[allow(clippy::unused_async)]
pub async fn proxy_options_preflight() -> impl IntoResponse {
    (
        StatusCode::NO_CONTENT,
        [
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (header::ACCESS_CONTROL_ALLOW_METHODS, "GET, HEAD, OPTIONS"),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, "Range, Content-Type"),
            (header::ACCESS_CONTROL_MAX_AGE, "86400"),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header as header_is, header_exists, method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    fn service() -> ProxyService {
        ProxyService::new("http://localhost:3000", Duration::from_secs(5), 64 * 1024).unwrap()
    }

    async fn body_text(response: ProxyResponse) -> String {
        match response.body {
            ProxyBody::Playlist(text) => text,
            ProxyBody::Stream(r) => r.text().await.unwrap(),
        }
    }

    #[tokio::test]
    async fn test_playlist_is_rewritten() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a/b/index.m3u8"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/vnd.apple.mpegurl")
                    .set_body_string("#EXTM3U\n#EXT-X-KEY:METHOD=AES-128,URI=\"key.bin\"\n#EXTINF:4,\nseg1.ts\n"),
            )
            .mount(&server)
            .await;

        let url = format!("{}/a/b/index.m3u8", server.uri());
        let response = service()
            .fetch(ProxyRequest { url: &url, ..ProxyRequest::default() })
            .await
            .unwrap();
        assert_eq!(response.kind, ResourceKind::Playlist);
        assert_eq!(response.content_type, PLAYLIST_CONTENT_TYPE);

        let text = body_text(response).await;
        let expected_seg = rewrite::encode_query_value(&format!("{}/a/b/seg1.ts", server.uri()));
        assert!(text.contains(&format!("http://localhost:3000/proxy?url={expected_seg}")));
        assert!(text.contains("METHOD=AES-128,URI=\"http://localhost:3000/proxy?url="));
    }

    #[tokio::test]
    async fn test_range_forwarded_and_partial_content_kept() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v/ep1.mp4"))
            .and(header_is("range", "bytes=0-3"))
            .respond_with(
                ResponseTemplate::new(206)
                    .insert_header("content-range", "bytes 0-3/100")
                    .insert_header("content-type", "video/mp4")
                    .set_body_bytes(vec![0_u8, 1, 2, 3]),
            )
            .mount(&server)
            .await;

        let url = format!("{}/v/ep1.mp4", server.uri());
        let response = service()
            .fetch(ProxyRequest {
                url: &url,
                range: Some("bytes=0-3"),
                ..ProxyRequest::default()
            })
            .await
            .unwrap();
        assert_eq!(response.status, StatusCode::PARTIAL_CONTENT);
        assert_eq!(response.content_range.as_deref(), Some("bytes 0-3/100"));
        assert_eq!(response.content_length, Some(4));

        let http = response.into_response();
        assert_eq!(http.headers()[header::ACCEPT_RANGES], "bytes");
        assert_eq!(http.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }

    #[tokio::test]
    async fn test_subtitle_retried_with_minimal_headers() {
        let server = MockServer::start().await;
        // full header bundle carries a Referer; the CDN refuses it
        Mock::given(method("GET"))
            .and(path("/subs/eng.vtt"))
            .and(header_exists("referer"))
            .respond_with(ResponseTemplate::new(403))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/subs/eng.vtt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("WEBVTT\n\n00:00.000 --> 00:01.000\nhi\n"))
            .expect(1)
            .mount(&server)
            .await;

        let url = format!("{}/subs/eng.vtt", server.uri());
        let response = service()
            .fetch(ProxyRequest { url: &url, ..ProxyRequest::default() })
            .await
            .unwrap();
        assert_eq!(response.kind, ResourceKind::Subtitle);
        assert_eq!(response.content_type, "text/vtt");
        assert!(body_text(response).await.starts_with("WEBVTT"));

        let requests: Vec<Request> = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 2);
        assert!(requests[1].headers.get("referer").is_none());
    }

    #[tokio::test]
    async fn test_subtitle_gives_up_after_second_attempt() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/subs/eng.vtt"))
            .respond_with(ResponseTemplate::new(403).set_body_string("denied"))
            .expect(2)
            .mount(&server)
            .await;

        let url = format!("{}/subs/eng.vtt", server.uri());
        let err = service()
            .fetch(ProxyRequest { url: &url, ..ProxyRequest::default() })
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::Blocked { status: 403, .. }));
    }

    #[tokio::test]
    async fn test_upstream_error_is_structured() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("no such segment"))
            .mount(&server)
            .await;

        let url = format!("{}/seg9.ts", server.uri());
        let err = service()
            .fetch(ProxyRequest { url: &url, ..ProxyRequest::default() })
            .await
            .unwrap_err();
        match err {
            ProxyError::Upstream { status, body, .. } => {
                assert_eq!(status, 404);
                assert_eq!(body, "no such segment");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_error_body_is_capped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("x".repeat(1024 * 1024)))
            .mount(&server)
            .await;

        let url = format!("{}/seg1.ts", server.uri());
        let err = service()
            .fetch(ProxyRequest { url: &url, ..ProxyRequest::default() })
            .await
            .unwrap_err();
        match err {
            ProxyError::Upstream { status, body, .. } => {
                assert_eq!(status, 503);
                assert!(body.ends_with("..."));
                assert!(body.len() <= error::MAX_ERROR_BODY + 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_playlist_fetched_without_client_range() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/live/index.m3u8"))
            .and(header_exists("range"))
            .respond_with(ResponseTemplate::new(206).set_body_string("#EXTM3U\n#EXTINF:4,\nse"))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/live/index.m3u8"))
            .respond_with(ResponseTemplate::new(200).set_body_string("#EXTM3U\n#EXTINF:4,\nseg1.ts\n#EXTINF:4,\nseg2.ts\n"))
            .mount(&server)
            .await;

        let url = format!("{}/live/index.m3u8", server.uri());
        let response = service()
            .fetch(ProxyRequest {
                url: &url,
                range: Some("bytes=0-20"),
                ..ProxyRequest::default()
            })
            .await
            .unwrap();
        assert_eq!(response.status, StatusCode::OK);
        let text = body_text(response).await;
        assert!(text.contains("seg1.ts") && text.contains("seg2.ts"));
    }

    #[tokio::test]
    async fn test_playlist_found_by_content_type_is_refetched_whole() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/live/stream"))
            .and(header_exists("range"))
            .respond_with(
                ResponseTemplate::new(206)
                    .insert_header("content-type", "application/vnd.apple.mpegurl")
                    .set_body_string("#EXTM3U\n#EXTINF:4,\nse"),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/live/stream"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/vnd.apple.mpegurl")
                    .set_body_string("#EXTM3U\n#EXTINF:4,\nseg1.ts\n"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let url = format!("{}/live/stream", server.uri());
        let response = service()
            .fetch(ProxyRequest {
                url: &url,
                range: Some("bytes=0-20"),
                ..ProxyRequest::default()
            })
            .await
            .unwrap();
        assert_eq!(response.kind, ResourceKind::Playlist);
        assert_eq!(response.status, StatusCode::OK);
        assert!(body_text(response).await.contains("seg1.ts"));
    }

    #[tokio::test]
    async fn test_oversized_playlist_refused() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!("#EXTM3U\n{}", "seg.ts\n".repeat(20_000))))
            .mount(&server)
            .await;

        let url = format!("{}/big.m3u8", server.uri());
        let err = service()
            .fetch(ProxyRequest { url: &url, ..ProxyRequest::default() })
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::TooLarge { .. }));
    }

    #[tokio::test]
    async fn test_rejects_non_http_targets() {
        let err = service()
            .fetch(ProxyRequest { url: "file:///etc/passwd", ..ProxyRequest::default() })
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::InvalidUrl(_)));
    }
}
