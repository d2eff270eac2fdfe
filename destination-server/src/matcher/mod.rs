//! Approximate place-name matching over a static reference table.

mod distance;
mod engine;
mod places;

pub use distance::{levenshtein, similarity};
pub use engine::{DEFAULT_MATCH_THRESHOLD, MatchEngine, MatchResult, Suggestion};
pub use places::{PlaceRecord, builtin_places};
