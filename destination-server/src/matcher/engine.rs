//! Approximate place-name matching.
//!
//! Corrects misspelled destination queries against the place reference
//! table and produces ranked "did you mean" suggestions. Every query is
//! a read-only scan over the immutable table, so the engine can be
//! shared and queried concurrently without coordination.

use serde::Serialize;

use super::distance::similarity;
use super::places::{PlaceRecord, builtin_places};

/// Minimum similarity for a match to count as "good".
pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.6;

/// Maximum suggestions attached to a [`MatchResult`].
const MAX_CORRECTION_SUGGESTIONS: usize = 3;

/// Default limit for [`MatchEngine::destination_suggestions`].
const DEFAULT_SUGGESTION_LIMIT: usize = 5;

/// Queries shorter than this yield no suggestions.
const MIN_SUGGESTION_QUERY_CHARS: usize = 2;

/// One ranked suggestion for a query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    /// Canonical destination name.
    pub name: String,

    /// Country of the destination.
    pub country: String,

    /// Similarity of the matched variation to the query, in [0, 1].
    pub score: f64,

    /// The variation string that produced the score.
    pub matched_variation: String,
}

/// Result of a best-match query.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MatchResult {
    /// Canonical name of the best-scoring destination, if any.
    pub destination: Option<String>,

    /// Similarity of the best match, in [0, 1].
    pub confidence: f64,

    /// Whether the query matched a known variation exactly.
    pub is_exact: bool,

    /// Whether the best score cleared the threshold.
    pub has_good_match: bool,

    /// Near-miss corrections, strongest first, at most three.
    pub suggestions: Vec<Suggestion>,
}

/// Approximate string-matching engine over the place reference table.
pub struct MatchEngine {
    places: Vec<PlaceRecord>,
}

impl MatchEngine {
    /// Engine over the built-in destination table.
    pub fn new() -> Self {
        Self::with_places(builtin_places())
    }

    /// Engine over a caller-supplied table (mainly for tests).
    pub fn with_places(places: Vec<PlaceRecord>) -> Self {
        Self { places }
    }

    /// Best match for a query at the default threshold.
    pub fn find_best_match(&self, query: &str) -> MatchResult {
        self.find_best_match_with_threshold(query, DEFAULT_MATCH_THRESHOLD)
    }

    /// Best match for a query.
    ///
    /// An exact hit on any known variation short-circuits with
    /// confidence 1.0 and no suggestions. Otherwise every
    /// (record, variation) pair is scored; the single best record wins
    /// (first encountered on ties) and near misses at or above the
    /// threshold become suggestions.
    pub fn find_best_match_with_threshold(&self, query: &str, threshold: f64) -> MatchResult {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return MatchResult::default();
        }

        // Exact-match fast path.
        for place in &self.places {
            if place.variations.iter().any(|v| *v == query) {
                return MatchResult {
                    destination: Some(place.name.clone()),
                    confidence: 1.0,
                    is_exact: true,
                    has_good_match: true,
                    suggestions: Vec::new(),
                };
            }
        }

        let mut best: Option<&PlaceRecord> = None;
        let mut best_score = f64::NEG_INFINITY;
        let mut candidates: Vec<Suggestion> = Vec::new();

        for place in &self.places {
            for variation in &place.variations {
                let score = similarity(&query, variation);

                // Strict comparison: the first record encountered keeps
                // a tied score.
                if score > best_score {
                    best = Some(place);
                    best_score = score;
                }

                if score >= threshold && score < 1.0 {
                    candidates.push(Suggestion {
                        name: place.name.clone(),
                        country: place.country.clone(),
                        score,
                        matched_variation: variation.clone(),
                    });
                }
            }
        }

        candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
        let suggestions = dedup_by_name(candidates, MAX_CORRECTION_SUGGESTIONS);

        MatchResult {
            destination: best.map(|p| p.name.clone()),
            confidence: best_score.max(0.0),
            is_exact: false,
            has_good_match: best_score >= threshold,
            suggestions,
        }
    }

    /// Prefix/substring suggestions at the default limit.
    pub fn destination_suggestions(&self, query: &str) -> Vec<Suggestion> {
        self.destination_suggestions_with_limit(query, DEFAULT_SUGGESTION_LIMIT)
    }

    /// Prefix/substring suggestions for a partial query.
    ///
    /// A record qualifies if any variation contains the query; the first
    /// qualifying variation supplies the record's single score. Queries
    /// shorter than two characters yield nothing.
    pub fn destination_suggestions_with_limit(&self, query: &str, limit: usize) -> Vec<Suggestion> {
        let query = query.trim().to_lowercase();
        if query.chars().count() < MIN_SUGGESTION_QUERY_CHARS {
            return Vec::new();
        }

        let mut candidates: Vec<Suggestion> = Vec::new();

        for place in &self.places {
            if let Some(variation) = place.variations.iter().find(|v| v.contains(&query)) {
                candidates.push(Suggestion {
                    name: place.name.clone(),
                    country: place.country.clone(),
                    score: similarity(&query, variation),
                    matched_variation: variation.clone(),
                });
            }
        }

        candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
        dedup_by_name(candidates, limit)
    }
}

impl Default for MatchEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Keep the first (highest, after sorting) suggestion per canonical
/// name, truncated to `limit`.
fn dedup_by_name(candidates: Vec<Suggestion>, limit: usize) -> Vec<Suggestion> {
    let mut seen: Vec<String> = Vec::new();
    let mut out: Vec<Suggestion> = Vec::new();

    for candidate in candidates {
        if seen.contains(&candidate.name) {
            continue;
        }
        seen.push(candidate.name.clone());
        out.push(candidate);
        if out.len() == limit {
            break;
        }
    }

    out
}
