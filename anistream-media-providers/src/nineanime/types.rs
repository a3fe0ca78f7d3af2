//! Records scraped from 9anime pages

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NineSearchItem {
    /// Watch path, e.g. `naruto.xx8z`
    pub id: String,
    pub title: String,
    pub poster: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NineWatchPage {
    pub id: String,
    /// Internal id used by the episode-list endpoint
    pub data_id: String,
    pub title: String,
    pub poster: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NineEpisode {
    pub number: u32,
    /// Comma-joined ids passed to the server-list endpoint
    pub ids: String,
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NineServer {
    pub name: String,
    /// `sub`, `dub` or `softsub`
    pub kind: String,
    pub link_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NineServerLink {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AjaxResult<T> {
    pub result: T,
}
