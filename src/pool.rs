//! Candidate command pool: flatten, rank, deduplicate, truncate.

use crate::scoring::{score_command, CommandWeights, RankedTest};
use std::collections::HashSet;

/// A subtest command considered during one query
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateCommand {
    pub test: String,
    pub subtest: String,
    pub description: String,
    pub command: String,
    pub score: i32,
}

/// Flatten the ranked tests' commands, each with its Stage-2 score.
pub fn assemble_pool(
    ranked: &[RankedTest<'_>],
    tokens: &[String],
    original_query: &str,
) -> Vec<CandidateCommand> {
    let weights = CommandWeights::default();
    ranked
        .iter()
        .flat_map(|r| r.test.subtests.iter())
        .map(|sub| CandidateCommand {
            test: sub.test_name.clone(),
            subtest: sub.name.clone(),
            description: sub.description.clone(),
            command: sub.command.clone(),
            score: score_command(sub, tokens, original_query, &weights),
        })
        .collect()
}

/// Sort descending by score, keep the first occurrence of each command
/// string, truncate to `min(limit, max_limit)`.
///
/// Limits are validated by the caller.
pub fn dedupe_and_truncate(
    mut pool: Vec<CandidateCommand>,
    limit: usize,
    max_limit: usize,
) -> Vec<CandidateCommand> {
    pool.sort_by(|a, b| b.score.cmp(&a.score));

    let mut seen: HashSet<String> = HashSet::new();
    pool.into_iter()
        .filter(|c| seen.insert(c.command.trim().to_string()))
        .take(limit.min(max_limit))
        .collect()
}
