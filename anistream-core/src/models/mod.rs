pub mod anime;
pub mod episode;
pub mod server;
pub mod source;

pub use anime::{AnimeInfo, AnimeSummary, Episode};
pub use episode::{Category, EpisodeRef};
pub use server::{AttemptOutcome, ProviderKind, ResolutionAttempt, ServerCandidate};
pub use source::{
    looks_like_playlist, normalize_quality, Source, SourceBundle, SubtitleTrack, TimeRange,
    QUALITY_AUTO,
};
