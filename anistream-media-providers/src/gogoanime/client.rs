//! Gogoanime HTTP Client

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};

use super::types::{GogoCategoryPage, GogoEmbedLink, GogoEpisodeLink, GogoSearchItem};
use crate::error::{check_response, text_with_limit, ProviderClientError};
use crate::http::{absolutize, build_client, join_url};
use crate::scrape::{attr, element_text, first_non_empty, Strategy};

static SEARCH_ITEM: LazyLock<Selector> = LazyLock::new(|| Selector::parse("ul.items li").expect("invalid selector"));
static SEARCH_NAME: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".name a[href]").expect("invalid selector"));
static SEARCH_IMG: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".img img").expect("invalid selector"));
static INFO_TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".anime_info_body_bg h1").expect("invalid selector"));
static INFO_IMG: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".anime_info_body_bg img").expect("invalid selector"));
static INFO_DESC: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".anime_info_body_bg .description").expect("invalid selector"));
static MOVIE_ID: LazyLock<Selector> = LazyLock::new(|| Selector::parse("#movie_id").expect("invalid selector"));
static ALIAS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("#alias_anime").expect("invalid selector"));
static EP_PAGE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("#episode_page a[ep_end]").expect("invalid selector"));
static EP_RELATED: LazyLock<Selector> = LazyLock::new(|| Selector::parse("#episode_related li a[href]").expect("invalid selector"));
static EP_ANY: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href*=\"-episode-\"]").expect("invalid selector"));
static MULTI_LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".anime_muti_link a[data-video]").expect("invalid selector"));
static IFRAME: LazyLock<Selector> = LazyLock::new(|| Selector::parse("iframe[src]").expect("invalid selector"));

static EPISODE_HREF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/([A-Za-z0-9._~-]+?)-episode-(\d+)(?:[/?#]|$)").expect("invalid regex"));
static EMBED_SCAN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:https?:)?//[^"'\s<>]+/(?:streaming|embedplus|load)\.php\?id=[^"'\s<>]+"#)
        .expect("invalid regex")
});

/// Gogoanime HTTP Client
pub struct GogoanimeClient {
    base_url: String,
    ajax_url: String,
    client: Client,
}

impl GogoanimeClient {
    pub fn new(
        base_url: impl Into<String>,
        ajax_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderClientError> {
        Ok(Self {
            base_url: base_url.into(),
            ajax_url: ajax_url.into(),
            client: build_client(timeout)?,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn search(&self, keyword: &str) -> Result<Vec<GogoSearchItem>, ProviderClientError> {
        let html = self.get_html(&self.base_url, "search.html", &[("keyword", keyword)]).await?;
        Ok(parse_search(&html))
    }

    pub async fn category(&self, slug: &str) -> Result<GogoCategoryPage, ProviderClientError> {
        let html = self
            .get_html(&self.base_url, &format!("category/{slug}"), &[])
            .await?;
        parse_category(&html, slug)
            .ok_or_else(|| ProviderClientError::Parse(format!("No anime info on category page {slug}")))
    }

    /// Episode links for a category page's `movie_id`/`alias`, covering
    /// episodes `0..=ep_end`.
    pub async fn episode_list(
        &self,
        movie_id: &str,
        alias: &str,
        ep_end: u32,
    ) -> Result<Vec<GogoEpisodeLink>, ProviderClientError> {
        let ep_end = ep_end.to_string();
        let fragment = self
            .get_html(
                &self.ajax_url,
                "ajax/load-list-episode",
                &[
                    ("ep_start", "0"),
                    ("ep_end", ep_end.as_str()),
                    ("id", movie_id),
                    ("default_ep", "0"),
                    ("alias", alias),
                ],
            )
            .await?;
        Ok(parse_episode_list(&fragment))
    }

    /// Embeds listed on `/<slug>-episode-<n>`
    pub async fn episode_embeds(
        &self,
        slug: &str,
        episode: u32,
    ) -> Result<Vec<GogoEmbedLink>, ProviderClientError> {
        let html = self
            .get_html(&self.base_url, &format!("{slug}-episode-{episode}"), &[])
            .await?;
        Ok(parse_embeds(&html))
    }

    async fn get_html(
        &self,
        base: &str,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<String, ProviderClientError> {
        let url = join_url(base, path);
        tracing::debug!(url = %url, "Gogoanime request");
        let resp = self
            .client
            .get(&url)
            .query(query)
            .header("Referer", self.base_url.as_str())
            .send()
            .await?;
        text_with_limit(check_response(resp)?).await
    }
}

/// Split an episode link into its anime slug and episode number.
#[must_use]
pub fn split_episode_href(href: &str) -> Option<(String, u32)> {
    let caps = EPISODE_HREF.captures(href.trim())?;
    let number = caps.get(2)?.as_str().parse().ok()?;
    Some((caps.get(1)?.as_str().to_string(), number))
}

pub(crate) fn parse_search(html: &str) -> Vec<GogoSearchItem> {
    let doc = Html::parse_document(html);
    doc.select(&SEARCH_ITEM)
        .filter_map(|li| {
            let link = li.select(&SEARCH_NAME).next()?;
            let href = attr(&link, "href")?;
            let id = href.trim_start_matches('/').trim_start_matches("category/").to_string();
            let title = attr(&link, "title").unwrap_or_else(|| element_text(&link));
            let poster = li.select(&SEARCH_IMG).next().and_then(|img| attr(&img, "src"));
            (!id.is_empty()).then_some(GogoSearchItem { id, title, poster })
        })
        .collect()
}

pub(crate) fn parse_category(html: &str, slug: &str) -> Option<GogoCategoryPage> {
    let doc = Html::parse_document(html);
    let title = doc.select(&INFO_TITLE).next().map(|h| element_text(&h))?;
    let value_of = |sel: &Selector| doc.select(sel).next().and_then(|el| attr(&el, "value"));
    let ep_end = doc
        .select(&EP_PAGE)
        .filter_map(|a| attr(&a, "ep_end")?.parse::<u32>().ok())
        .max();

    Some(GogoCategoryPage {
        id: slug.to_string(),
        title,
        poster: doc.select(&INFO_IMG).next().and_then(|img| attr(&img, "src")),
        description: doc
            .select(&INFO_DESC)
            .next()
            .map(|d| element_text(&d))
            .filter(|d| !d.is_empty()),
        movie_id: value_of(&MOVIE_ID),
        alias: value_of(&ALIAS),
        ep_end,
    })
}

fn links_to_episodes<'a>(anchors: impl Iterator<Item = scraper::ElementRef<'a>>) -> Vec<GogoEpisodeLink> {
    anchors
        .filter_map(|a| {
            let href = attr(&a, "href")?;
            let (anime_slug, number) = split_episode_href(&href)?;
            Some(GogoEpisodeLink {
                number,
                anime_slug,
                href,
            })
        })
        .collect()
}

fn episodes_from_related(doc: &Html) -> Vec<GogoEpisodeLink> {
    links_to_episodes(doc.select(&EP_RELATED))
}

fn episodes_from_any_link(doc: &Html) -> Vec<GogoEpisodeLink> {
    links_to_episodes(doc.select(&EP_ANY))
}

pub(crate) fn parse_episode_list(fragment: &str) -> Vec<GogoEpisodeLink> {
    let doc = Html::parse_fragment(fragment);
    let strategies: [Strategy<GogoEpisodeLink>; 2] = [
        ("episode-related", episodes_from_related),
        ("any-episode-link", episodes_from_any_link),
    ];
    let mut episodes = first_non_empty(&doc, &strategies, |ep| ep.number > 0);
    // The list arrives newest first.
    episodes.sort_by_key(|ep| ep.number);
    episodes.dedup_by_key(|ep| ep.number);
    episodes
}

fn embeds_from_server_list(doc: &Html) -> Vec<GogoEmbedLink> {
    doc.select(&MULTI_LINK)
        .filter_map(|a| {
            let url = attr(&a, "data-video")?;
            let server = a
                .parent()
                .and_then(scraper::ElementRef::wrap)
                .and_then(|li| li.value().classes().next().map(ToString::to_string))
                // the default server's list item is classed `anime`
                .map(|class| if class == "anime" { "vidstreaming".to_string() } else { class })
                .unwrap_or_else(|| {
                    element_text(&a)
                        .split_whitespace()
                        .next()
                        .unwrap_or_default()
                        .to_lowercase()
                });
            Some(GogoEmbedLink {
                server,
                url: absolutize("https://", &url),
            })
        })
        .collect()
}

fn embeds_from_iframe(doc: &Html) -> Vec<GogoEmbedLink> {
    doc.select(&IFRAME)
        .filter_map(|f| attr(&f, "src"))
        .map(|src| GogoEmbedLink {
            server: "vidstreaming".to_string(),
            url: absolutize("https://", &src),
        })
        .collect()
}

fn embeds_from_scan(doc: &Html) -> Vec<GogoEmbedLink> {
    let html = doc.html();
    EMBED_SCAN
        .find_iter(&html)
        .map(|m| GogoEmbedLink {
            server: "vidstreaming".to_string(),
            url: absolutize("https://", &m.as_str().replace("&amp;", "&")),
        })
        .collect()
}

pub(crate) fn parse_embeds(html: &str) -> Vec<GogoEmbedLink> {
    let doc = Html::parse_document(html);
    let strategies: [Strategy<GogoEmbedLink>; 3] = [
        ("server-list", embeds_from_server_list),
        ("iframe", embeds_from_iframe),
        ("embed-scan", embeds_from_scan),
    ];
    first_non_empty(&doc, &strategies, |e| {
        e.url.starts_with("https://") || e.url.starts_with("http://")
    })
}
