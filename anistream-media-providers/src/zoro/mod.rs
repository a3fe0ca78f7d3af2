//! Zoro-family site scraper
//!
//! hianime and its zoro mirrors share one page layout and one set of
//! AJAX endpoints (`/ajax/v2/episode/...`) that return HTML fragments
//! wrapped in JSON. One client serves all of them; only the base URL
//! differs.

pub mod client;
pub mod types;

pub use client::ZoroClient;
