pub mod catalog;
pub mod ranking;
pub mod resolver;

pub use catalog::CatalogService;
pub use ranking::pick_default;
pub use resolver::{Resolution, ResolveRequest, SourceResolver};
