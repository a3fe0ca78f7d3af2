//! Gogoanime site scraper
//!
//! Pages live on the main site; the paginated episode list comes from a
//! separate AJAX host. Dubbed releases are separate titles whose slug ends
//! in `-dub`.

pub mod client;
pub mod types;

pub use client::GogoanimeClient;
