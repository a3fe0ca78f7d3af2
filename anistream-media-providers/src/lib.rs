// Anistream Provider Clients
//
// Pure HTTP clients for the upstream anime sites. Each client returns the
// site's raw shapes (serde structs or scraped HTML records); mapping into
// the normalized schema is the job of the adapters in anistream-core.
//
// Architecture:
// - anistream-media-providers: Pure HTTP clients (Aniwatch API, Zoro, Gogoanime, AnimePahe, 9anime)
// - anistream-core/provider: AnimeProvider trait implementations (adapters calling these clients)
// - anistream-core/service: SourceResolver walking the candidate list

// Shared error types
pub mod error;

// Shared HTTP and scraping helpers
pub mod http;
pub mod scrape;

// HTTP clients (no AnimeProvider dependency)
pub mod animepahe;
pub mod aniwatch;
pub mod gogoanime;
pub mod nineanime;
pub mod zoro;

// Re-export client types for convenience
pub use animepahe::AnimePaheClient;
pub use aniwatch::AniwatchClient;
pub use error::ProviderClientError;
pub use gogoanime::GogoanimeClient;
pub use nineanime::NineAnimeClient;
pub use zoro::ZoroClient;
