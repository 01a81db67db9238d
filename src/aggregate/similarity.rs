use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Default score at or above which two headlines are flagged as duplicates
pub const DUP_THRESHOLD: f64 = 0.65;

/// Below this many tokens the overlap coefficient is replaced by Jaccard
const MIN_OVERLAP_TOKENS: usize = 3;

const STOP_WORDS: &[&str] = &[
    "a", "about", "after", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has",
    "have", "in", "into", "is", "it", "its", "of", "on", "or", "over", "that", "the", "this",
    "to", "was", "will", "with",
];

/// Headline similarity metric
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMetric {
    /// Overlap of stemmed, stop-word-free tokens
    #[default]
    TokenOverlap,
    /// Dice coefficient over character bigrams
    Bigram,
}

impl SimilarityMetric {
    pub fn score(&self, a: &str, b: &str) -> f64 {
        match self {
            SimilarityMetric::TokenOverlap => similarity(a, b),
            SimilarityMetric::Bigram => bigram_similarity(a, b),
        }
    }
}

/// Similarity of two headlines in [0, 1]
///
/// Tokens are lowercased alphanumeric runs with stop words removed and a
/// light suffix stemmer applied. With at least three tokens on each side the
/// score is `|A ∩ B| / min(|A|, |B|)`, so a trailing outlet name or an extra
/// word does not dilute it; shorter titles use `|A ∩ B| / |A ∪ B|`.
pub fn similarity(a: &str, b: &str) -> f64 {
    let left = tokens(a);
    let right = tokens(b);

    if left.is_empty() || right.is_empty() {
        return if left.is_empty() && right.is_empty() && normalize(a) == normalize(b) {
            1.0
        } else {
            0.0
        };
    }

    let shared = left.intersection(&right).count() as f64;
    let smaller = left.len().min(right.len());

    if smaller >= MIN_OVERLAP_TOKENS {
        shared / smaller as f64
    } else {
        let union = left.union(&right).count() as f64;
        shared / union
    }
}

/// Dice coefficient over the character bigrams of the normalized strings
pub fn bigram_similarity(a: &str, b: &str) -> f64 {
    let left = normalize(a);
    let right = normalize(b);
    if left == right {
        return 1.0;
    }

    let left = bigrams(&left);
    let right = bigrams(&right);
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }

    let mut remaining = right.clone();
    let mut shared = 0usize;
    for pair in &left {
        if let Some(pos) = remaining.iter().position(|p| p == pair) {
            remaining.swap_remove(pos);
            shared += 1;
        }
    }

    2.0 * shared as f64 / (left.len() + right.len()) as f64
}

/// Lowercase, keep alphanumerics and collapse everything else to single spaces
fn normalize(text: &str) -> String {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn tokens(text: &str) -> BTreeSet<String> {
    normalize(text)
        .split(' ')
        .filter(|w| !w.is_empty() && !STOP_WORDS.contains(w))
        .map(stem)
        .collect()
}

/// Strip common English inflections
fn stem(word: &str) -> String {
    let len = word.chars().count();
    let cut = if len > 5 && word.ends_with("ing") {
        3
    } else if len > 4 && (word.ends_with("ed") || word.ends_with("es")) {
        2
    } else if len > 3 && word.ends_with('s') && !word.ends_with("ss") {
        1
    } else {
        0
    };
    // Suffixes are ASCII, so the byte cut lands on a char boundary
    word[..word.len() - cut].to_string()
}

fn bigrams(text: &str) -> Vec<(char, char)> {
    let chars: Vec<char> = text.chars().filter(|c| !c.is_whitespace()).collect();
    chars.windows(2).map(|w| (w[0], w[1])).collect()
}
