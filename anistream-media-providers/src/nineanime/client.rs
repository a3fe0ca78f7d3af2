//! 9anime HTTP Client

use std::sync::LazyLock;
use std::time::Duration;

use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use serde::de::DeserializeOwned;

use super::types::{AjaxResult, NineEpisode, NineSearchItem, NineServer, NineServerLink, NineWatchPage};
use crate::error::{check_response, json_with_limit, text_with_limit, ProviderClientError};
use crate::http::{build_client, join_url};
use crate::scrape::{attr, element_text};

static SEARCH_ITEM: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".ani.items .item").expect("invalid selector"));
static SEARCH_NAME: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".name a[href], a.name[href]").expect("invalid selector"));
static IMG: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img").expect("invalid selector"));
static WATCH_MAIN: LazyLock<Selector> = LazyLock::new(|| Selector::parse("#watch-main[data-id]").expect("invalid selector"));
static WATCH_TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1.title, h1[itemprop=\"name\"]").expect("invalid selector"));
static WATCH_POSTER: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".binfo .poster img").expect("invalid selector"));
static WATCH_DESC: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".synopsis .content").expect("invalid selector"));
static EPISODE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[data-ids][data-num]").expect("invalid selector"));
static SERVER_GROUP: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".servers .type[data-type]").expect("invalid selector"));
static SERVER_ITEM: LazyLock<Selector> = LazyLock::new(|| Selector::parse("li[data-link-id]").expect("invalid selector"));

/// 9anime HTTP Client
pub struct NineAnimeClient {
    base_url: String,
    client: Client,
}

impl NineAnimeClient {
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

    pub async fn search(&self, keyword: &str) -> Result<Vec<NineSearchItem>, ProviderClientError> {
        let url = join_url(&self.base_url, "filter");
        tracing::debug!(url = %url, "9anime search request");
        let resp = self.client.get(&url).query(&[("keyword", keyword)]).send().await?;
        let html = text_with_limit(check_response(resp)?).await?;
        Ok(parse_search(&html))
    }

    pub async fn watch_page(&self, id: &str) -> Result<NineWatchPage, ProviderClientError> {
        let url = join_url(&self.base_url, &format!("watch/{id}"));
        tracing::debug!(url = %url, "9anime watch page request");
        let resp = self.client.get(&url).send().await?;
        let html = text_with_limit(check_response(resp)?).await?;
        parse_watch_page(&html, id)
            .ok_or_else(|| ProviderClientError::Parse(format!("No watch data on page {id}")))
    }

    pub async fn episodes(&self, data_id: &str) -> Result<Vec<NineEpisode>, ProviderClientError> {
        let envelope: AjaxResult<String> = self.get_ajax(&format!("ajax/episode/list/{data_id}")).await?;
        Ok(parse_episodes(&envelope.result))
    }

    pub async fn servers(&self, episode_ids: &str) -> Result<Vec<NineServer>, ProviderClientError> {
        let envelope: AjaxResult<String> = self.get_ajax(&format!("ajax/server/list/{episode_ids}")).await?;
        Ok(parse_servers(&envelope.result))
    }

    /// Embed URL behind a server's link id
    pub async fn server_link(&self, link_id: &str) -> Result<NineServerLink, ProviderClientError> {
        let envelope: AjaxResult<NineServerLink> = self.get_ajax(&format!("ajax/server/{link_id}")).await?;
        Ok(envelope.result)
    }

    async fn get_ajax<T: DeserializeOwned>(&self, path: &str) -> Result<T, ProviderClientError> {
        let url = join_url(&self.base_url, path);
        tracing::debug!(url = %url, "9anime AJAX request");
        let resp = self
            .client
            .get(&url)
            .header("X-Requested-With", "XMLHttpRequest")
            .header("Referer", self.base_url.as_str())
            .send()
            .await?;
        json_with_limit(check_response(resp)?).await
    }
}

fn first_attr(el: &ElementRef<'_>, names: &[&str]) -> Option<String> {
    names.iter().find_map(|n| attr(el, n))
}

pub(crate) fn parse_search(html: &str) -> Vec<NineSearchItem> {
    let doc = Html::parse_document(html);
    doc.select(&SEARCH_ITEM)
        .filter_map(|item| {
            let link = item.select(&SEARCH_NAME).next()?;
            let href = attr(&link, "href")?;
            let id = href
                .split(['?', '#'])
                .next()
                .unwrap_or_default()
                .trim_start_matches('/')
                .trim_start_matches("watch/")
                .to_string();
            let poster = item
                .select(&IMG)
                .next()
                .and_then(|img| first_attr(&img, &["data-src", "src"]));
            (!id.is_empty()).then(|| NineSearchItem {
                id,
                title: element_text(&link),
                poster,
            })
        })
        .collect()
}

pub(crate) fn parse_watch_page(html: &str, id: &str) -> Option<NineWatchPage> {
    let doc = Html::parse_document(html);
    let data_id = doc.select(&WATCH_MAIN).next().and_then(|m| attr(&m, "data-id"))?;
    let title = doc.select(&WATCH_TITLE).next().map(|t| element_text(&t))?;
    Some(NineWatchPage {
        id: id.to_string(),
        data_id,
        title,
        poster: doc.select(&WATCH_POSTER).next().and_then(|img| attr(&img, "src")),
        description: doc
            .select(&WATCH_DESC)
            .next()
            .map(|d| element_text(&d))
            .filter(|d| !d.is_empty()),
    })
}

pub(crate) fn parse_episodes(fragment: &str) -> Vec<NineEpisode> {
    let doc = Html::parse_fragment(fragment);
    doc.select(&EPISODE)
        .filter_map(|a| {
            Some(NineEpisode {
                number: attr(&a, "data-num")?.parse().ok()?,
                ids: attr(&a, "data-ids")?,
                title: attr(&a, "title"),
            })
        })
        .collect()
}

pub(crate) fn parse_servers(fragment: &str) -> Vec<NineServer> {
    let doc = Html::parse_fragment(fragment);
    doc.select(&SERVER_GROUP)
        .flat_map(|group| {
            let kind = attr(&group, "data-type").unwrap_or_default();
            group
                .select(&SERVER_ITEM)
                .filter_map(|li| {
                    Some(NineServer {
                        name: element_text(&li).to_lowercase(),
                        kind: kind.clone(),
                        link_id: attr(&li, "data-link-id")?,
                    })
                })
                .collect::<Vec<_>>()
        })
        .collect()
}
