// Anime Provider System
//
// Two-tier architecture:
//
// Tier 1: anistream-media-providers (pure upstream HTTP clients)
//   - AniwatchClient, ZoroClient, GogoanimeClient, AnimePaheClient, NineAnimeClient
//   - Return raw upstream shapes, know nothing about the normalized schema
//
// Tier 2: anistream-core/provider (AnimeProvider adapters)
//   - AniwatchProvider, ZoroProvider, GogoanimeProvider, AnimePaheProvider, NineAnimeProvider
//   - Explicit field mapping from tier-1 shapes, ID normalization,
//     embed extraction through crate::extractor
//
// The adapters are collected in a ProviderRegistry that the
// SourceResolver (crate::service) walks.

// Core traits and types
pub mod error;
pub mod normalize;
pub mod registry;
pub mod traits;

// AnimeProvider implementations (adapters)
pub mod animepahe;
pub mod aniwatch;
pub mod gogoanime;
pub mod nineanime;
pub mod zoro;

pub use error::*;
pub use registry::*;
pub use traits::*;

pub use animepahe::AnimePaheProvider;
pub use aniwatch::AniwatchProvider;
pub use gogoanime::GogoanimeProvider;
pub use nineanime::NineAnimeProvider;
pub use zoro::ZoroProvider;
