//! Pluggable word/name relatedness lookup

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Relatedness of two words or names, in [0, 1], when known
pub trait Thesaurus {
    fn lookup(&self, first: &str, second: &str) -> Option<f64>;
}

/// Thesaurus that knows nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoThesaurus;

impl Thesaurus for NoThesaurus {
    fn lookup(&self, _first: &str, _second: &str) -> Option<f64> {
        None
    }
}

/// Configured group of related words
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThesaurusEntry {
    pub words: Vec<String>,
    #[serde(default = "default_score")]
    pub score: f64,
}

fn default_score() -> f64 {
    1.0
}

/// Symmetric, case-insensitive table of related word pairs
#[derive(Debug, Clone, Default)]
pub struct ThesaurusTable {
    pairs: HashMap<(String, String), f64>,
}

impl ThesaurusTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every pair of words in each entry becomes related with the entry's score
    pub fn from_entries(entries: &[ThesaurusEntry]) -> Self {
        let mut table = Self::new();
        for entry in entries {
            for (i, first) in entry.words.iter().enumerate() {
                for second in &entry.words[i + 1..] {
                    table.insert(first, second, entry.score);
                }
            }
        }
        table
    }

    /// Relate two words; scores are clamped to [0, 1]
    pub fn insert(&mut self, first: &str, second: &str, score: f64) {
        let score = score.clamp(0.0, 1.0);
        self.pairs.insert(Self::key(first, second), score);
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    fn key(first: &str, second: &str) -> (String, String) {
        let a = first.to_lowercase();
        let b = second.to_lowercase();
        if a <= b { (a, b) } else { (b, a) }
    }
}

impl Thesaurus for ThesaurusTable {
    fn lookup(&self, first: &str, second: &str) -> Option<f64> {
        self.pairs.get(&Self::key(first, second)).copied()
    }
}
