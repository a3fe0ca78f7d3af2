pub mod models;
pub mod service;
pub mod cache;
pub mod provider;
pub mod extractor;
pub mod config;
pub mod error;
pub mod logging;
pub mod bootstrap;
pub mod resilience;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use config::Config;
pub use error::{Error, Result};
pub use service::{pick_default, CatalogService, Resolution, ResolveRequest, SourceResolver};
