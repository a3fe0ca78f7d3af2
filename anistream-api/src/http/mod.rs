// Module: http
// JSON REST surface over the resolver, the catalogue and the media proxy

pub mod catalog;
pub mod error;
pub mod health;
pub mod middleware;
pub mod proxy;
pub mod sources;

use std::sync::Arc;

use axum::{extract::Request, middleware::from_fn, Router};
use anistream_core::bootstrap::Services;
use anistream_core::service::{CatalogService, SourceResolver};
use anistream_proxy::ProxyService;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use error::{AppError, AppResult};

/// Shared application state
#[derive(Clone, Debug)]
pub struct AppState {
    pub resolver: SourceResolver,
    pub catalog: CatalogService,
    pub proxy: ProxyService,
    /// Where clients reach this server; used to wrap resolved URLs
    pub public_base_url: Arc<str>,
}

impl AppState {
    #[must_use]
    pub fn new(services: Services, proxy: ProxyService, public_base_url: &str) -> Self {
        Self {
            resolver: services.resolver,
            catalog: services.catalog,
            proxy,
            public_base_url: Arc::from(public_base_url.trim_end_matches('/')),
        }
    }
}

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    let router = Router::new()
        // Health check endpoints (for monitoring probes)
        .merge(health::create_health_router())
        // Episode source resolution
        .merge(sources::create_sources_router())
        // Search, info and episode listing
        .merge(catalog::create_catalog_router())
        // Media proxy
        .merge(proxy::create_proxy_router());

    // ServiceBuilder applies top to bottom: the request id is set before
    // the trace span opens
    let router = router.layer(
        ServiceBuilder::new()
            .layer(from_fn(middleware::request_id_middleware))
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
                let request_id = middleware::request_id_of(request).unwrap_or("-");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }))
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any)
                    .expose_headers(Any),
            ),
    );

    // Apply state to all routes (must be last)
    router.with_state(state)
}
