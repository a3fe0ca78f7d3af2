//! AnimePahe HTTP Client

use std::sync::LazyLock;
use std::time::Duration;

use reqwest::Client;
use scraper::{Html, Selector};
use serde::de::DeserializeOwned;

use super::types::{PaheRelease, PaheReleasePage, PaheSearchItem, PaheSearchResponse, PaheStreamButton};
use crate::error::{check_response, json_with_limit, text_with_limit, ProviderClientError};
use crate::http::{build_client, join_url};
use crate::scrape::attr;

static STREAM_BUTTON: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("#resolutionMenu button[data-src], button[data-src][data-resolution]")
        .expect("invalid selector")
});

/// Upper bound on release pages walked for one anime
const MAX_RELEASE_PAGES: u32 = 40;

const DDG_COOKIE: &str = "__ddg2_=";

/// AnimePahe HTTP Client
pub struct AnimePaheClient {
    base_url: String,
    client: Client,
}

impl AnimePaheClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ProviderClientError> {
        Ok(Self {
            base_url: base_url.into(),
            client: build_client(timeout)?,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn search(&self, query: &str) -> Result<Vec<PaheSearchItem>, ProviderClientError> {
        let resp: PaheSearchResponse = self.get_api(&[("m", "search"), ("q", query)]).await?;
        Ok(resp.data)
    }

    /// One page of releases, ascending by episode
    pub async fn releases(&self, anime_session: &str, page: u32) -> Result<PaheReleasePage, ProviderClientError> {
        let page = page.to_string();
        self.get_api(&[
            ("m", "release"),
            ("id", anime_session),
            ("sort", "episode_asc"),
            ("page", page.as_str()),
        ])
        .await
    }

    /// Every release, walking pages until `last_page`
    pub async fn all_releases(&self, anime_session: &str) -> Result<Vec<PaheRelease>, ProviderClientError> {
        let first = self.releases(anime_session, 1).await?;
        let last_page = first.last_page.min(MAX_RELEASE_PAGES);
        let mut releases = first.data;
        for page in 2..=last_page {
            releases.extend(self.releases(anime_session, page).await?.data);
        }
        Ok(releases)
    }

    /// Stream buttons on `/play/<anime>/<episode>`
    pub async fn stream_buttons(
        &self,
        anime_session: &str,
        episode_session: &str,
    ) -> Result<Vec<PaheStreamButton>, ProviderClientError> {
        let url = join_url(&self.base_url, &format!("play/{anime_session}/{episode_session}"));
        tracing::debug!(url = %url, "AnimePahe play page request");
        let resp = self
            .client
            .get(&url)
            .header("Cookie", DDG_COOKIE)
            .header("Referer", self.base_url.as_str())
            .send()
            .await?;
        let html = text_with_limit(check_response(resp)?).await?;
        Ok(parse_stream_buttons(&html))
    }

    async fn get_api<T: DeserializeOwned>(&self, query: &[(&str, &str)]) -> Result<T, ProviderClientError> {
        let url = join_url(&self.base_url, "api");
        tracing::debug!(url = %url, "AnimePahe API request");
        let resp = self
            .client
            .get(&url)
            .query(query)
            .header("Cookie", DDG_COOKIE)
            .header("Referer", self.base_url.as_str())
            .send()
            .await?;
        json_with_limit(check_response(resp)?).await
    }
}

pub(crate) fn parse_stream_buttons(html: &str) -> Vec<PaheStreamButton> {
    let doc = Html::parse_document(html);
    doc.select(&STREAM_BUTTON)
        .filter_map(|b| {
            Some(PaheStreamButton {
                embed_url: attr(&b, "data-src")?,
                resolution: attr(&b, "data-resolution").and_then(|r| r.parse().ok()),
                audio: attr(&b, "data-audio"),
                fansub: attr(&b, "data-fansub"),
            })
        })
        .collect()
}
