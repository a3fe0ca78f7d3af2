//! Zoro-family HTTP Client

use std::sync::LazyLock;
use std::time::Duration;

use reqwest::Client;
use scraper::{Html, Selector};

use super::types::{
    AjaxHtml, ZoroAnimePage, ZoroEpisodeLink, ZoroSearchItem, ZoroServerItem, ZoroSourceLink,
};
use crate::error::{check_response, json_with_limit, text_with_limit, ProviderClientError};
use crate::http::{build_client, join_url};
use crate::scrape::{attr, element_text, first_non_empty, trailing_number, Strategy};

// Compile-time constant selectors; parsing cannot fail on them.
static SEARCH_CARD: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div.flw-item").expect("invalid selector"));
static SEARCH_LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".film-name a[href]").expect("invalid selector"));
static POSTER: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img.film-poster-img").expect("invalid selector"));
static DETAIL_TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".anisc-detail .film-name").expect("invalid selector"));
static DETAIL_POSTER: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".anisc-poster img, .film-poster img").expect("invalid selector"));
static DETAIL_DESC: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".film-description .text").expect("invalid selector"));
static EP_ITEM: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a.ep-item[data-id]").expect("invalid selector"));
static EP_ANY_LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href*=\"?ep=\"]").expect("invalid selector"));
static SERVER_ITEM: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".server-item[data-id]").expect("invalid selector"));

/// Zoro-family HTTP Client
pub struct ZoroClient {
    base_url: String,
    client: Client,
}

impl ZoroClient {
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

    /// Search result cards
    pub async fn search(&self, keyword: &str) -> Result<Vec<ZoroSearchItem>, ProviderClientError> {
        let html = self.get_page("search", &[("keyword", keyword)]).await?;
        Ok(parse_search(&html))
    }

    /// Anime detail page for a slug
    pub async fn anime_page(&self, slug: &str) -> Result<ZoroAnimePage, ProviderClientError> {
        let html = self.get_page(slug, &[]).await?;
        parse_anime_page(&html, slug)
            .ok_or_else(|| ProviderClientError::Parse(format!("No anime detail found on page {slug}")))
    }

    /// Episode anchors for an anime, keyed by the numeric id at the end of its slug
    pub async fn episode_list(&self, numeric_id: &str) -> Result<Vec<ZoroEpisodeLink>, ProviderClientError> {
        let fragment = self
            .get_ajax(&format!("ajax/v2/episode/list/{numeric_id}"), &[])
            .await?;
        Ok(parse_episode_list(&fragment))
    }

    /// Server buttons for an upstream episode id
    pub async fn servers(&self, episode_id: &str) -> Result<Vec<ZoroServerItem>, ProviderClientError> {
        let fragment = self
            .get_ajax("ajax/v2/episode/servers", &[("episodeId", episode_id)])
            .await?;
        Ok(parse_servers(&fragment))
    }

    /// Embed link for a server button's `data-id`
    pub async fn source_link(&self, data_id: &str) -> Result<ZoroSourceLink, ProviderClientError> {
        let url = join_url(&self.base_url, "ajax/v2/episode/sources");
        let resp = self
            .client
            .get(&url)
            .query(&[("id", data_id)])
            .header("X-Requested-With", "XMLHttpRequest")
            .header("Referer", self.base_url.as_str())
            .send()
            .await?;
        json_with_limit(check_response(resp)?).await
    }

    async fn get_page(&self, path: &str, query: &[(&str, &str)]) -> Result<String, ProviderClientError> {
        let url = join_url(&self.base_url, path);
        tracing::debug!(url = %url, "Zoro page request");
        let resp = self.client.get(&url).query(query).send().await?;
        text_with_limit(check_response(resp)?).await
    }

    async fn get_ajax(&self, path: &str, query: &[(&str, &str)]) -> Result<String, ProviderClientError> {
        let url = join_url(&self.base_url, path);
        tracing::debug!(url = %url, "Zoro AJAX request");
        let resp = self
            .client
            .get(&url)
            .query(query)
            .header("X-Requested-With", "XMLHttpRequest")
            .header("Referer", self.base_url.as_str())
            .send()
            .await?;
        let envelope: AjaxHtml = json_with_limit(check_response(resp)?).await?;
        Ok(envelope.html)
    }
}

/// Numeric id carried at the end of a zoro slug (`naruto-677` → `677`).
#[must_use]
pub fn numeric_id(slug: &str) -> Option<&str> {
    let (_, tail) = slug.rsplit_once('-')?;
    (!tail.is_empty() && tail.chars().all(|c| c.is_ascii_digit())).then_some(tail)
}

/// Slug part of a site link, dropping leading `/watch/` and any query.
#[must_use]
pub fn slug_from_href(href: &str) -> String {
    let path = href.split(['?', '#']).next().unwrap_or_default();
    let path = path
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    let path = path.split_once('/').map_or(path, |(host, rest)| {
        if host.contains('.') { rest } else { path }
    });
    path.trim_matches('/')
        .trim_start_matches("watch/")
        .to_string()
}

pub(crate) fn parse_search(html: &str) -> Vec<ZoroSearchItem> {
    let doc = Html::parse_document(html);
    doc.select(&SEARCH_CARD)
        .filter_map(|card| {
            let link = card.select(&SEARCH_LINK).next()?;
            let id = slug_from_href(&attr(&link, "href")?);
            let title = attr(&link, "title").unwrap_or_else(|| element_text(&link));
            let poster = card
                .select(&POSTER)
                .next()
                .and_then(|img| attr(&img, "data-src").or_else(|| attr(&img, "src")));
            (!id.is_empty()).then_some(ZoroSearchItem { id, title, poster })
        })
        .collect()
}

pub(crate) fn parse_anime_page(html: &str, slug: &str) -> Option<ZoroAnimePage> {
    let doc = Html::parse_document(html);
    let title = doc.select(&DETAIL_TITLE).next().map(|t| element_text(&t))?;
    let poster = doc
        .select(&DETAIL_POSTER)
        .next()
        .and_then(|img| attr(&img, "src").or_else(|| attr(&img, "data-src")));
    let description = doc
        .select(&DETAIL_DESC)
        .next()
        .map(|d| element_text(&d))
        .filter(|d| !d.is_empty());
    Some(ZoroAnimePage {
        id: slug.to_string(),
        title,
        poster,
        description,
    })
}

fn episodes_from_items(doc: &Html) -> Vec<ZoroEpisodeLink> {
    doc.select(&EP_ITEM)
        .filter_map(|a| {
            Some(ZoroEpisodeLink {
                number: attr(&a, "data-number")?.parse().ok()?,
                episode_id: attr(&a, "data-id")?,
                href: attr(&a, "href")?,
                title: attr(&a, "title"),
            })
        })
        .collect()
}

fn episodes_from_any_link(doc: &Html) -> Vec<ZoroEpisodeLink> {
    doc.select(&EP_ANY_LINK)
        .enumerate()
        .filter_map(|(idx, a)| {
            let href = attr(&a, "href")?;
            let episode_id = href.split_once("?ep=")?.1.to_string();
            let number = attr(&a, "data-number")
                .and_then(|n| n.parse().ok())
                .or_else(|| trailing_number(&element_text(&a)))
                .unwrap_or(idx as u32 + 1);
            Some(ZoroEpisodeLink {
                number,
                episode_id,
                href,
                title: attr(&a, "title"),
            })
        })
        .collect()
}

pub(crate) fn parse_episode_list(fragment: &str) -> Vec<ZoroEpisodeLink> {
    let doc = Html::parse_fragment(fragment);
    let strategies: [Strategy<ZoroEpisodeLink>; 2] = [
        ("ep-item", episodes_from_items),
        ("any-ep-link", episodes_from_any_link),
    ];
    first_non_empty(&doc, &strategies, |ep| ep.number > 0 && !ep.episode_id.is_empty())
}

pub(crate) fn parse_servers(fragment: &str) -> Vec<ZoroServerItem> {
    let doc = Html::parse_fragment(fragment);
    doc.select(&SERVER_ITEM)
        .filter_map(|item| {
            Some(ZoroServerItem {
                name: element_text(&item),
                kind: attr(&item, "data-type")?,
                data_id: attr(&item, "data-id")?,
                server_id: attr(&item, "data-server-id"),
            })
        })
        .filter(|s| !s.name.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const EPISODES_HTML: &str = r#"
        <div class="ss-list">
          <a class="ssl-item ep-item" data-number="1" data-id="12352" href="/watch/naruto-677?ep=12352" title="Enter: Naruto Uzumaki!"></a>
          <a class="ssl-item ep-item" data-number="2" data-id="12353" href="/watch/naruto-677?ep=12353" title="My Name is Konohamaru!"></a>
          <a class="ssl-item ep-item" data-number="1" data-id="99999" href="/watch/bleach-806?ep=99999" title="Stray"></a>
        </div>"#;

    #[test]
    fn test_numeric_id() {
        assert_eq!(numeric_id("naruto-677"), Some("677"));
        assert_eq!(numeric_id("one-piece-100"), Some("100"));
        assert_eq!(numeric_id("naruto"), None);
        assert_eq!(numeric_id("naruto-"), None);
    }

    #[test]
    fn test_slug_from_href() {
        assert_eq!(slug_from_href("/watch/naruto-677?ep=12352"), "naruto-677");
        assert_eq!(slug_from_href("/naruto-677?ref=search"), "naruto-677");
        assert_eq!(slug_from_href("https://hianime.example/watch/naruto-677"), "naruto-677");
    }

    #[test]
    fn test_parse_episode_list_keeps_raw_links() {
        let eps = parse_episode_list(EPISODES_HTML);
        assert_eq!(eps.len(), 3);
        assert_eq!(eps[0].number, 1);
        assert_eq!(eps[0].episode_id, "12352");
        assert_eq!(eps[2].href, "/watch/bleach-806?ep=99999");
    }

    #[test]
    fn test_parse_episode_list_brute_force_fallback() {
        let html = r#"<ul><li><a href="/watch/naruto-677?ep=5">Episode 1</a></li>
                      <li><a href="/watch/naruto-677?ep=6">Episode 2</a></li></ul>"#;
        let eps = parse_episode_list(html);
        assert_eq!(eps.len(), 2);
        assert_eq!(eps[1].number, 2);
        assert_eq!(eps[1].episode_id, "6");
    }

    #[test]
    fn test_parse_servers() {
        let html = r#"
          <div class="ps_-block">
            <div class="item server-item" data-type="sub" data-id="641" data-server-id="4"><a class="btn">HD-1</a></div>
            <div class="item server-item" data-type="dub" data-id="642" data-server-id="1"><a class="btn">HD-2</a></div>
          </div>"#;
        let servers = parse_servers(html);
        assert_eq!(servers.len(), 2);
        assert_eq!(servers[0].name, "HD-1");
        assert_eq!(servers[1].kind, "dub");
        assert_eq!(servers[1].data_id, "642");
    }

    #[test]
    fn test_parse_search() {
        let html = r#"
          <div class="flw-item">
            <img class="film-poster-img" data-src="https://img.example/n.jpg">
            <h3 class="film-name"><a href="/naruto-677?ref=search" title="Naruto">Naruto</a></h3>
          </div>"#;
        let items = parse_search(html);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "naruto-677");
        assert_eq!(items[0].poster.as_deref(), Some("https://img.example/n.jpg"));
    }

    #[tokio::test]
    async fn test_episode_list_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ajax/v2/episode/list/677"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": true,
                "html": EPISODES_HTML,
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/ajax/v2/episode/sources"))
            .and(query_param("id", "641"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "type": "iframe",
                "link": "https://megacloud.example/embed-2/e-1/AbC123?k=1",
                "server": 4,
            })))
            .mount(&server)
            .await;

        let client = ZoroClient::new(server.uri(), Duration::from_secs(5)).unwrap();
        assert_eq!(client.episode_list("677").await.unwrap().len(), 3);
        let link = client.source_link("641").await.unwrap();
        assert_eq!(link.link, "https://megacloud.example/embed-2/e-1/AbC123?k=1");
    }
}
