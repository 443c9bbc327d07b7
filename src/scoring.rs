//! Two-stage relevance scoring.
//!
//! Stage 1 ranks tests by literal token overlap with their name, keywords,
//! description and subtest names. Stage 2 ranks individual subtest commands
//! inside the ranked tests. Both stages are pure functions over the index;
//! weights and intent bonuses live in named tables.

use crate::index::{SubtestRecord, TestIndex, TestRecord};
use crate::query::normalize;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use tracing::debug;

// ============================================================================
// Scoring Weights
// ============================================================================

/// Stage-1 weights per token and field
#[derive(Debug, Clone, Copy)]
pub struct TestWeights {
    /// Token contained in the test name
    pub name: i32,
    /// Token contained in any keyword
    pub keyword: i32,
    /// Token contained in the description
    pub description: i32,
    /// Token contained in any subtest name
    pub subtest_name: i32,
    /// Per distinct token found, applied when more than one token was found
    pub co_occurrence: i32,
}

impl Default for TestWeights {
    fn default() -> Self {
        Self {
            name: 5,
            keyword: 3,
            description: 2,
            subtest_name: 2,
            co_occurrence: 5,
        }
    }
}

/// Stage-2 weights
#[derive(Debug, Clone, Copy)]
pub struct CommandWeights {
    /// Per token found in the subtest keywords
    pub keyword: i32,
    /// Per token found in the subtest description
    pub description: i32,
    /// Per token found in the command text
    pub command: i32,
    /// Whole query found verbatim in the description
    pub query_in_description: i32,
    /// Whole query found verbatim in the command
    pub query_in_command: i32,
}

impl Default for CommandWeights {
    fn default() -> Self {
        Self {
            keyword: 10,
            description: 8,
            command: 5,
            query_in_description: 15,
            query_in_command: 10,
        }
    }
}

/// A narrow command-pattern / query-intent pair worth a fixed bonus.
pub struct IntentBonus {
    pub name: &'static str,
    /// Matched against the lower-cased command
    pub command_pattern: Regex,
    /// Matched against each query token
    pub intent_pattern: Regex,
    pub bonus: i32,
}

impl IntentBonus {
    fn new(name: &'static str, command: &str, intent: &str, bonus: i32) -> Self {
        Self {
            name,
            command_pattern: Regex::new(command).unwrap(),
            intent_pattern: Regex::new(intent).unwrap(),
            bonus,
        }
    }

    /// True when the command shows the pattern and a token shows the intent.
    pub fn applies(&self, command_lower: &str, tokens: &[String]) -> bool {
        self.command_pattern.is_match(command_lower)
            && tokens.iter().any(|t| self.intent_pattern.is_match(t))
    }
}

lazy_static! {
    pub static ref INTENT_BONUSES: Vec<IntentBonus> = vec![
        IntentBonus::new("streaming", r"(^|\s)-dash\b|\bcmaf=", "dash|cmaf|mpd|segment", 4),
        IntentBonus::new("rendering", r"compositor:|vout\b|png\b|rgb\b", "render|bifs|png|rgb", 3),
        IntentBonus::new("inspection", r"inspect:|analy[sz]e=on|dump\b", "inspect|probe|boxes?", 2),
        IntentBonus::new("encryption", r"-crypt\b|encryption|cenc", "encrypt|crypt|cenc|drm", 4),
    ];
}

// ============================================================================
// Stage 1: test scoring
// ============================================================================

/// A test with its Stage-1 score
#[derive(Debug, Clone, Copy)]
pub struct RankedTest<'a> {
    pub test: &'a TestRecord,
    pub score: i32,
}

/// Score one test against the query tokens.
pub fn score_test(test: &TestRecord, tokens: &[String], weights: &TestWeights) -> i32 {
    let name = normalize(&test.name);
    let keywords: Vec<String> = test.keywords.iter().map(|k| normalize(k)).collect();
    let description = normalize(&test.description);
    let subtest_names: Vec<String> = test.subtests.iter().map(|s| normalize(&s.name)).collect();

    let haystack = std::iter::once(name.as_str())
        .chain(keywords.iter().map(String::as_str))
        .chain(std::iter::once(description.as_str()))
        .chain(subtest_names.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ");

    let mut score = 0;
    let mut found: HashSet<String> = HashSet::new();

    for token in tokens {
        let token = normalize(token);
        if !haystack.contains(&token) {
            continue;
        }
        if name.contains(&token) {
            score += weights.name;
        }
        if keywords.iter().any(|k| k.contains(&token)) {
            score += weights.keyword;
        }
        if description.contains(&token) {
            score += weights.description;
        }
        if subtest_names.iter().any(|s| s.contains(&token)) {
            score += weights.subtest_name;
        }
        found.insert(token);
    }

    if found.len() > 1 {
        score += found.len() as i32 * weights.co_occurrence;
    }

    score
}

/// Score every test, drop zero scores, sort descending.
///
/// The sort is stable, so ties keep index order.
pub fn rank_tests<'a>(index: &'a TestIndex, tokens: &[String]) -> Vec<RankedTest<'a>> {
    let weights = TestWeights::default();
    let mut ranked: Vec<RankedTest> = index
        .records()
        .iter()
        .map(|test| RankedTest {
            test,
            score: score_test(test, tokens, &weights),
        })
        .filter(|r| r.score > 0)
        .collect();
    ranked.sort_by(|a, b| b.score.cmp(&a.score));
    ranked
}

// ============================================================================
// Stage 2: command scoring
// ============================================================================

/// Score one subtest command against the tokens and the original query.
pub fn score_command(
    subtest: &SubtestRecord,
    tokens: &[String],
    original_query: &str,
    weights: &CommandWeights,
) -> i32 {
    let command = normalize(&subtest.command);
    let description = normalize(&subtest.description);
    let keywords = subtest
        .keywords
        .iter()
        .map(|k| normalize(k))
        .collect::<Vec<_>>()
        .join(" ");
    let query = normalize(original_query.trim());

    let count = |text: &str| tokens.iter().filter(|t| text.contains(t.as_str())).count() as i32;

    let mut score = count(&keywords) * weights.keyword
        + count(&description) * weights.description
        + count(&command) * weights.command;

    if !query.is_empty() {
        if description.contains(&query) {
            score += weights.query_in_description;
        }
        if command.contains(&query) {
            score += weights.query_in_command;
        }
    }

    for bonus in INTENT_BONUSES.iter() {
        if bonus.applies(&command, tokens) {
            debug!(
                "{}/{}: {} bonus +{}",
                subtest.test_name, subtest.name, bonus.name, bonus.bonus
            );
            score += bonus.bonus;
        }
    }

    score
}
