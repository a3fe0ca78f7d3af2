//! Records scraped from zoro-family pages

use serde::Deserialize;

/// Search result card
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoroSearchItem {
    /// Slug taken from the card link, e.g. `naruto-677`
    pub id: String,
    pub title: String,
    pub poster: Option<String>,
}

/// Anime detail page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoroAnimePage {
    pub id: String,
    pub title: String,
    pub poster: Option<String>,
    pub description: Option<String>,
}

/// Episode anchor from the episode-list fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoroEpisodeLink {
    pub number: u32,
    /// Upstream episode id (`data-id`)
    pub episode_id: String,
    /// Watch link, e.g. `/watch/naruto-677?ep=12352`
    pub href: String,
    pub title: Option<String>,
}

/// Server button from the servers fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoroServerItem {
    pub name: String,
    /// `sub`, `dub` or `raw`
    pub kind: String,
    /// Id passed to the sources endpoint
    pub data_id: String,
    pub server_id: Option<String>,
}

/// Response of the sources endpoint: an embed link
#[derive(Debug, Clone, Deserialize)]
pub struct ZoroSourceLink {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    pub link: String,
    #[serde(default)]
    pub server: Option<u32>,
}

/// AJAX envelope carrying an HTML fragment
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AjaxHtml {
    pub html: String,
}
