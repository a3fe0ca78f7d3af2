//! AnimePahe API Data Structures

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct PaheSearchItem {
    #[serde(default)]
    pub id: Option<u64>,
    pub title: String,
    /// Opaque anime session used by the release API and play pages
    pub session: String,
    #[serde(default)]
    pub poster: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub episodes: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaheSearchResponse {
    #[serde(default)]
    pub data: Vec<PaheSearchItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaheRelease {
    /// Episode number; fractional for recap specials
    pub episode: f64,
    pub session: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub snapshot: Option<String>,
    #[serde(default)]
    pub filler: u8,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaheReleasePage {
    #[serde(default)]
    pub total: u32,
    #[serde(default = "first_page")]
    pub current_page: u32,
    #[serde(default = "first_page")]
    pub last_page: u32,
    #[serde(default)]
    pub data: Vec<PaheRelease>,
}

const fn first_page() -> u32 {
    1
}

/// Stream choice on the play page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaheStreamButton {
    /// Kwik embed URL (`data-src`)
    pub embed_url: String,
    /// Vertical resolution, e.g. `1080`
    pub resolution: Option<u32>,
    /// `jpn` or `eng`
    pub audio: Option<String>,
    pub fansub: Option<String>,
}
