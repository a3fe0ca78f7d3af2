//! 9anime client
//!
//! HTML watch pages plus AJAX endpoints wrapping their payload in a
//! `{"result": ...}` envelope: an HTML fragment for lists, an object for
//! the final server link.

pub mod client;
pub mod types;

pub use client::NineAnimeClient;
