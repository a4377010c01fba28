//! Lexical name similarity
//!
//! Identifiers are split into lowercase words (camelCase, snake_case, digits),
//! words are compared pairwise and the pair scores are combined with a
//! fuzzy OR. A thesaurus can relate whole names or single words.

pub mod pluralization;
pub mod thesaurus;

pub use thesaurus::{NoThesaurus, Thesaurus, ThesaurusEntry, ThesaurusTable};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::services::matching::fuzzy::soft_or_all;

static WORD_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Z]+[a-z]*|[a-z]+|[0-9]+").expect("word pattern is a valid regex")
});

/// Score given to a singular/plural word pair
pub const NUMBER_VARIANT_SCORE: f64 = 0.9;

/// Split an identifier into lowercase words
///
/// `clientName` → `[client, name]`, `order_total2` → `[order, total, 2]`.
/// A run of capitals followed by lowercase letters stays one word
/// (`URLPath` → `[urlpath]`).
pub fn split_identifier(name: &str) -> Vec<String> {
    WORD_PATTERN
        .find_iter(name)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

/// Similarity of two single words
///
/// A thesaurus entry wins over everything, even for identical words.
pub fn word_similarity(first: &str, second: &str, thesaurus: &dyn Thesaurus) -> f64 {
    if let Some(score) = symmetric_lookup(first, second, thesaurus) {
        return score;
    }
    if first.eq_ignore_ascii_case(second) {
        return 1.0;
    }
    if pluralization::are_number_variants(first, second) {
        return NUMBER_VARIANT_SCORE;
    }
    0.0
}

/// Similarity of two names, rounded to 3 decimals
///
/// A thesaurus entry for the whole names wins, then equal names score 1;
/// otherwise every word pair is scored and the scores are combined with a
/// fuzzy OR.
pub fn name_similarity(first: &str, second: &str, thesaurus: &dyn Thesaurus) -> f64 {
    if let Some(score) = symmetric_lookup(first, second, thesaurus) {
        return round3(score);
    }
    if first.eq_ignore_ascii_case(second) {
        return 1.0;
    }

    let left = split_identifier(first);
    let right = split_identifier(second);

    let mut scores: Vec<f64> = left
        .iter()
        .flat_map(|u| right.iter().map(move |v| (u, v)))
        .map(|(u, v)| word_similarity(u, v, thesaurus))
        .filter(|score| *score > 0.0)
        .collect();
    // fold in a fixed order so that sim(x, y) == sim(y, x) bit for bit
    scores.sort_by(|a, b| a.total_cmp(b));

    round3(soft_or_all(scores))
}

fn symmetric_lookup(first: &str, second: &str, thesaurus: &dyn Thesaurus) -> Option<f64> {
    match (thesaurus.lookup(first, second), thesaurus.lookup(second, first)) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}

pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
