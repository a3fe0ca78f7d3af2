//! Aniwatch API Data Structures
//!
//! These mirror the upstream JSON exactly; nothing here is part of the
//! normalized schema.

use std::collections::HashMap;

use serde::Deserialize;

/// Episode counts per audio category
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiEpisodeCounts {
    #[serde(default)]
    pub sub: Option<u32>,
    #[serde(default)]
    pub dub: Option<u32>,
}

/// Anime entry in search results
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiAnime {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub poster: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub episodes: Option<ApiEpisodeCounts>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiSearchPayload {
    #[serde(default)]
    pub animes: Vec<ApiAnime>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiStats {
    #[serde(default)]
    pub episodes: Option<ApiEpisodeCounts>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

/// Detailed anime information
#[derive(Debug, Clone, Deserialize)]
pub struct ApiAnimeDetail {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub poster: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub stats: Option<ApiStats>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiAnimeWrapper {
    pub info: ApiAnimeDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiInfoPayload {
    pub anime: ApiAnimeWrapper,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEpisode {
    pub number: u32,
    #[serde(default)]
    pub title: Option<String>,
    /// Upstream episode id, `"<anime-id>?ep=<internal id>"`
    pub episode_id: String,
    #[serde(default)]
    pub is_filler: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEpisodesPayload {
    #[serde(default)]
    pub total_episodes: u32,
    #[serde(default)]
    pub episodes: Vec<ApiEpisode>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiServer {
    pub server_name: String,
    #[serde(default)]
    pub server_id: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiServersPayload {
    #[serde(default)]
    pub sub: Vec<ApiServer>,
    #[serde(default)]
    pub dub: Vec<ApiServer>,
    #[serde(default)]
    pub raw: Vec<ApiServer>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSource {
    pub url: String,
    #[serde(default)]
    pub is_m3u8: bool,
    #[serde(default)]
    pub quality: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiTrack {
    #[serde(alias = "file")]
    pub url: String,
    #[serde(default, alias = "label")]
    pub lang: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ApiTimeRange {
    pub start: f64,
    pub end: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiSourcesPayload {
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub sources: Vec<ApiSource>,
    #[serde(default, alias = "subtitles")]
    pub tracks: Vec<ApiTrack>,
    #[serde(default)]
    pub intro: Option<ApiTimeRange>,
    #[serde(default)]
    pub outro: Option<ApiTimeRange>,
}
