//! AnimePahe client
//!
//! Search and episode listing go through a small JSON API keyed by opaque
//! session ids; stream choices are buttons on the HTML play page. Every
//! request carries an empty `__ddg2_` cookie, which the edge requires.

pub mod client;
pub mod types;

pub use client::AnimePaheClient;
