// anistream HTTP API
//
// axum routes for source resolution, catalogue lookups and the media proxy

pub mod http;

pub use http::{create_router, AppState};
