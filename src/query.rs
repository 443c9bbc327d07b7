//! Query decomposition and text normalization.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Words never treated as search tokens: articles, conjunctions,
/// prepositions, question words, auxiliaries and pronouns.
pub const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "from",
    "by", "via", "how", "what", "when", "where", "why", "is", "are", "was", "were", "be", "been",
    "have", "has", "had", "do", "does", "did", "will", "would", "should", "could", "can", "may",
    "might", "must", "i", "you", "he", "she", "it", "we", "they", "this", "that", "these",
    "those", "my", "your", "his", "her", "its", "our", "their",
];

lazy_static! {
    static ref RE_SPLIT: Regex = Regex::new(r"[\s,]+|\bwith\b|\band\b").unwrap();
    static ref STOP_SET: HashSet<&'static str> = STOP_WORDS.iter().copied().collect();
}

/// Lower-case and strip diacritics (NFKD, combining marks dropped).
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect()
}

/// Split a free-text goal into significant, normalized tokens.
///
/// An empty result means no match is possible; callers must not read it
/// as "match everything".
pub fn decompose_query(goal: &str) -> Vec<String> {
    let normalized = normalize(goal);
    RE_SPLIT
        .split(&normalized)
        .map(str::trim)
        .filter(|token| !token.is_empty() && !STOP_SET.contains(*token))
        .map(str::to_string)
        .collect()
}
