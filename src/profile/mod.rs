//! Player profile: per-game results, detected tendencies, and the coarse
//! summaries that seed the next session.

mod store;
mod types;

pub use store::{JsonProfileStore, MemoryProfileStore, ProfileStore};
pub use types::{
    GameId, GameResult, GameStats, PatternSummary, Profile, MAX_PATTERN_TAGS, MAX_SERIES_POINTS,
};
