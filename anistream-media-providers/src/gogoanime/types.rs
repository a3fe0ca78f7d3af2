//! Records scraped from gogoanime pages

/// Search result entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GogoSearchItem {
    /// Category slug, e.g. `naruto` or `naruto-dub`
    pub id: String,
    pub title: String,
    pub poster: Option<String>,
}

/// `/category/<slug>` page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GogoCategoryPage {
    pub id: String,
    pub title: String,
    pub poster: Option<String>,
    pub description: Option<String>,
    /// Internal id for the episode-list AJAX call (`#movie_id`)
    pub movie_id: Option<String>,
    /// `#alias_anime`
    pub alias: Option<String>,
    /// Highest `ep_end` among the pagination anchors
    pub ep_end: Option<u32>,
}

/// Episode link from the episode-list fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GogoEpisodeLink {
    pub number: u32,
    /// Category slug derived from the link (`/naruto-episode-3` → `naruto`)
    pub anime_slug: String,
    /// Absolute or site-relative link to the episode page
    pub href: String,
}

/// Embed offered on an episode page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GogoEmbedLink {
    /// Server label, e.g. `vidstreaming`, `streamsb`
    pub server: String,
    /// Absolute embed URL
    pub url: String,
}
