//! Keyword-weighted asset ranking.
//!
//! Relevance here is lexical: case-insensitive, bidirectional substring
//! containment between each keyword and each field value. No vectors, no
//! embeddings. A candidate that overlaps no field at all is a non-match and
//! is excluded entirely rather than ranked last.

use crate::config::MatchingConfig;
use crate::models::{Asset, MatchResult};

/// Per-field scoring bonuses. Kept as plain data so the weights stay
/// configurable rather than baked into the algorithm.
#[derive(Debug, Clone, Copy)]
pub struct MatchWeights {
    pub tag_bonus: i64,
    pub description_bonus: i64,
    pub source_label_bonus: i64,
    pub mood_bonus: i64,
}

impl Default for MatchWeights {
    fn default() -> Self {
        Self {
            tag_bonus: 10,
            description_bonus: 5,
            source_label_bonus: 3,
            mood_bonus: 7,
        }
    }
}

impl From<&MatchingConfig> for MatchWeights {
    fn from(config: &MatchingConfig) -> Self {
        Self {
            tag_bonus: config.tag_bonus,
            description_bonus: config.description_bonus,
            source_label_bonus: config.source_label_bonus,
            mood_bonus: config.mood_bonus,
        }
    }
}

/// Ranks assets against keyword queries over an immutable registry snapshot
/// taken at construction.
pub struct Matcher {
    assets: Vec<Asset>,
    weights: MatchWeights,
}

impl Matcher {
    pub fn new(assets: Vec<Asset>, weights: MatchWeights) -> Self {
        Self { assets, weights }
    }

    /// Score every asset and return the top `limit` in descending score
    /// order. Ties keep registry order (stable sort). Zero-scoring assets
    /// never appear, regardless of `limit`.
    pub fn rank(&self, keywords: &[String], limit: usize) -> Vec<MatchResult> {
        let keywords: Vec<String> = keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();

        if keywords.is_empty() {
            return Vec::new();
        }

        let mut results: Vec<MatchResult> = self
            .assets
            .iter()
            .filter_map(|asset| {
                let score = self.score_asset(asset, &keywords);
                (score > 0).then(|| MatchResult {
                    asset: asset.clone(),
                    score,
                })
            })
            .collect();

        // Stable sort: equal scores keep registry order
        results.sort_by(|a, b| b.score.cmp(&a.score));
        results.truncate(limit);
        results
    }

    fn score_asset(&self, asset: &Asset, keywords: &[String]) -> i64 {
        let mut score = 0;

        for tag in &asset.tags {
            let tag = tag.trim().to_lowercase();
            if tag.is_empty() {
                continue;
            }
            if keywords.iter().any(|kw| contains_either(kw, &tag)) {
                score += self.weights.tag_bonus;
            }
        }

        let description = asset.description.trim().to_lowercase();
        if !description.is_empty() {
            for kw in keywords {
                if contains_either(kw, &description) {
                    score += self.weights.description_bonus;
                }
            }
        }

        if let Some(label) = &asset.source_label {
            let label = label.trim().to_lowercase();
            if !label.is_empty() {
                for kw in keywords {
                    if contains_either(kw, &label) {
                        score += self.weights.source_label_bonus;
                    }
                }
            }
        }

        if let Some(mood) = &asset.mood {
            let mood = mood.trim().to_lowercase();
            if !mood.is_empty() && keywords.iter().any(|kw| *kw == mood) {
                score += self.weights.mood_bonus;
            }
        }

        score
    }
}

/// Bidirectional substring containment.
fn contains_either(a: &str, b: &str) -> bool {
    a.contains(b) || b.contains(a)
}
