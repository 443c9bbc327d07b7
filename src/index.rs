//! In-memory test index built from the corpus and the alias table.

use crate::aliases::{alias_key, AliasTable};
use crate::corpus::{Corpus, CorpusTest};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tracing::info;

#[derive(Debug, Clone, PartialEq)]
pub struct SubtestRecord {
    /// Owning test name (back-reference only)
    pub test_name: String,
    pub name: String,
    pub description: String,
    /// Own keywords, or a copy of the parent's merged keywords
    pub keywords: Vec<String>,
    pub command: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TestRecord {
    pub name: String,
    pub description: String,
    /// Corpus keywords merged with alias tags, first occurrence kept
    pub keywords: Vec<String>,
    pub subtests: Vec<SubtestRecord>,
}

/// Counts reported after a load
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStats {
    pub tests: usize,
    pub subtests: usize,
    pub alias_entries: usize,
    /// Tests that received at least one tag from the alias table
    pub alias_enriched_tests: usize,
    pub loaded_at: DateTime<Utc>,
}

/// Immutable, insertion-ordered map from test name to record.
#[derive(Debug, Clone)]
pub struct TestIndex {
    records: Vec<TestRecord>,
    positions: HashMap<String, usize>,
    stats: IndexStats,
}

impl TestIndex {
    /// Build the index in one pass over the corpus.
    pub fn build(corpus: &Corpus, aliases: &AliasTable) -> Self {
        let mut records: Vec<TestRecord> = Vec::with_capacity(corpus.len());
        let mut positions = HashMap::with_capacity(corpus.len());
        let mut enriched = 0;

        for test in corpus.tests() {
            let alias_tags = aliases.tags(&alias_key(test));
            if alias_tags.iter().any(|t| !test.keywords.contains(t)) {
                enriched += 1;
            }
            let record = build_record(test, alias_tags);
            match positions.get(&record.name) {
                Some(&i) => records[i] = record,
                None => {
                    positions.insert(record.name.clone(), records.len());
                    records.push(record);
                }
            }
        }

        let stats = IndexStats {
            tests: records.len(),
            subtests: records.iter().map(|r| r.subtests.len()).sum(),
            alias_entries: aliases.len(),
            alias_enriched_tests: enriched,
            loaded_at: Utc::now(),
        };
        info!(
            "[INDEX] tests: {}, subtests: {}, aliases: {} ({} tests enriched)",
            stats.tests, stats.subtests, stats.alias_entries, stats.alias_enriched_tests
        );

        Self {
            records,
            positions,
            stats,
        }
    }

    /// Records in corpus order.
    pub fn records(&self) -> &[TestRecord] {
        &self.records
    }

    pub fn get(&self, name: &str) -> Option<&TestRecord> {
        self.positions.get(name).map(|&i| &self.records[i])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn stats(&self) -> &IndexStats {
        &self.stats
    }
}

/// Union of two keyword lists, keeping first occurrences in order.
///
/// Comparison is exact; normalization happens at query time.
pub fn merge_keywords(base: &[String], extra: &[String]) -> Vec<String> {
    let mut merged: Vec<String> = Vec::with_capacity(base.len() + extra.len());
    for keyword in base.iter().chain(extra) {
        if !merged.contains(keyword) {
            merged.push(keyword.clone());
        }
    }
    merged
}

fn build_record(test: &CorpusTest, alias_tags: &[String]) -> TestRecord {
    let keywords = merge_keywords(&test.keywords, alias_tags);

    let subtests = test
        .subtests
        .iter()
        .map(|sub| SubtestRecord {
            test_name: test.name.clone(),
            name: sub.name.clone(),
            description: sub.description.clone().unwrap_or_default(),
            keywords: if sub.keywords.is_empty() {
                keywords.clone()
            } else {
                sub.keywords.clone()
            },
            command: sub.command.clone(),
        })
        .collect();

    TestRecord {
        name: test.name.clone(),
        description: test.description.clone().unwrap_or_default(),
        keywords,
        subtests,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::CorpusSubtest;
    use std::collections::HashSet;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn sample_corpus() -> Corpus {
        Corpus::from_tests(vec![
            CorpusTest {
                name: "aac-sbr".into(),
                description: Some("AAC SBR".into()),
                keywords: strings(&["aac"]),
                file: Some("aac-sbr.sh".into()),
                subtests: vec![
                    CorpusSubtest {
                        name: "dash".into(),
                        description: None,
                        keywords: vec![],
                        command: "MP4Box -dash 1000 counter.264".into(),
                    },
                    CorpusSubtest {
                        name: "own".into(),
                        description: Some("own keywords".into()),
                        keywords: strings(&["mine"]),
                        command: "MP4Box -info counter.mp4".into(),
                    },
                ],
            },
            CorpusTest {
                name: "bare".into(),
                description: None,
                keywords: vec![],
                file: None,
                subtests: vec![],
            },
        ])
    }

    fn sample_aliases() -> AliasTable {
        let mut map = HashMap::new();
        map.insert("aac-sbr".to_string(), strings(&["audio", "aac", "dash"]));
        map.insert("bare".to_string(), strings(&["misc"]));
        AliasTable::from_map(map)
    }

    #[test]
    fn test_merge_keywords_dedupes_case_sensitively() {
        let merged = merge_keywords(&strings(&["aac", "AAC"]), &strings(&["aac", "dash"]));
        assert_eq!(merged, strings(&["aac", "AAC", "dash"]));
    }

    #[test]
    fn test_build_enriches_and_inherits() {
        let index = TestIndex::build(&sample_corpus(), &sample_aliases());
        assert_eq!(index.len(), 2);

        let test = index.get("aac-sbr").unwrap();
        assert_eq!(test.keywords, strings(&["aac", "audio", "dash"]));
        assert_eq!(test.subtests[0].keywords, test.keywords);
        assert_eq!(test.subtests[0].test_name, "aac-sbr");
        assert_eq!(test.subtests[1].keywords, strings(&["mine"]));

        let bare = index.get("bare").unwrap();
        assert_eq!(bare.keywords, strings(&["misc"]));
        assert_eq!(bare.description, "");
        assert_eq!(index.stats().alias_enriched_tests, 2);
    }

    #[test]
    fn test_inherited_keywords_are_copies() {
        let index = TestIndex::build(&sample_corpus(), &sample_aliases());
        let mut test = index.get("aac-sbr").unwrap().clone();
        test.keywords.push("extra".into());
        assert!(!test.subtests[0].keywords.contains(&"extra".to_string()));
    }

    #[test]
    fn test_rebuild_is_field_equal() {
        let a = TestIndex::build(&sample_corpus(), &sample_aliases());
        let b = TestIndex::build(&sample_corpus(), &sample_aliases());
        assert_eq!(a.len(), b.len());
        for (x, y) in a.records().iter().zip(b.records()) {
            assert_eq!(x.name, y.name);
            assert_eq!(x.description, y.description);
            let kx: HashSet<_> = x.keywords.iter().collect();
            let ky: HashSet<_> = y.keywords.iter().collect();
            assert_eq!(kx, ky);
            assert_eq!(x.subtests, y.subtests);
        }
    }

    #[test]
    fn test_empty_inputs() {
        let index = TestIndex::build(&Corpus::default(), &AliasTable::default());
        assert!(index.is_empty());
        assert_eq!(index.stats().subtests, 0);
    }
}
