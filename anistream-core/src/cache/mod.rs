pub mod key_builder;
pub mod resolution_cache;

pub use key_builder::{search_key, sources_key};
pub use resolution_cache::ResolutionCache;
