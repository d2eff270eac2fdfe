//! Destination search server internals.
//!
//! Two independent components: a keyed data-fetch cache with
//! per-consumer request sequencing (`fetch`) and an approximate
//! string-matching engine for correcting misspelled place names
//! (`matcher`).

pub mod fetch;
pub mod matcher;
