//! Aniwatch REST API client
//!
//! Client for the JSON API that fronts the hianime catalogue
//! (`/api/v2/hianime/...`).

pub mod client;
pub mod types;

pub use client::AniwatchClient;
