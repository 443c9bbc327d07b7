//! Test summaries, full test details and dry-run reproduction scripts.

use crate::index::{SubtestRecord, TestRecord};
use lazy_static::lazy_static;
use regex::{Captures, NoExpand, Regex};
use serde::Serialize;
use std::collections::HashSet;

lazy_static! {
    static ref RE_WORD: Regex = Regex::new(r"\w+").unwrap();
    /// Switches, `:options`, `name:option`, acronyms and snake_case words
    static ref RE_TECHNICAL: Regex =
        Regex::new(r"(?:^|\s)(-\w+|:\w+|\w+:\w+|[A-Z]{2,}|\w+(?:_\w+)+)").unwrap();
    static ref RE_OUT_DIR: Regex = Regex::new(r"\bout/").unwrap();
    static ref RE_TOOL_NAME: Regex = Regex::new(r"\b(MP4Box|gpac)\b").unwrap();
}

/// First `max` characters of `text`.
pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

// ============================================================================
// Summaries
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubtestSummary {
    pub name: String,
    pub desc: String,
}

/// Test without commands, for search and listing pages
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSummary {
    pub name: String,
    pub desc: String,
    pub keywords: Vec<String>,
    pub subtest_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtests: Option<Vec<SubtestSummary>>,
}

impl TestSummary {
    pub fn from_record(record: &TestRecord, include_subtests: bool, max_desc: usize) -> Self {
        Self {
            name: record.name.clone(),
            desc: truncate_chars(&record.description, max_desc),
            keywords: record.keywords.clone(),
            subtest_count: record.subtests.len(),
            subtests: include_subtests.then(|| {
                record
                    .subtests
                    .iter()
                    .map(|s| SubtestSummary {
                        name: s.name.clone(),
                        desc: truncate_chars(&s.description, max_desc),
                    })
                    .collect()
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestPage {
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
    pub returned: usize,
    pub tests: Vec<TestSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TestPage {
    /// Page `offset..offset + limit` of `records`.
    pub fn paginate<'a>(
        records: impl ExactSizeIterator<Item = &'a TestRecord>,
        offset: usize,
        limit: usize,
        include_subtests: bool,
        max_desc: usize,
    ) -> Self {
        let total = records.len();
        let tests: Vec<TestSummary> = records
            .skip(offset)
            .take(limit)
            .map(|r| TestSummary::from_record(r, include_subtests, max_desc))
            .collect();
        Self {
            total,
            offset,
            limit,
            returned: tests.len(),
            tests,
            error: None,
        }
    }

    pub fn error(offset: usize, limit: usize, message: &str) -> Self {
        Self {
            total: 0,
            offset,
            limit,
            returned: 0,
            tests: Vec::new(),
            error: Some(message.to_string()),
        }
    }
}

// ============================================================================
// Detail
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubtestDetail {
    pub name: String,
    pub description: String,
    pub keywords: Vec<String>,
    pub command: String,
}

impl From<&SubtestRecord> for SubtestDetail {
    fn from(record: &SubtestRecord) -> Self {
        Self {
            name: record.name.clone(),
            description: record.description.clone(),
            keywords: record.keywords.clone(),
            command: record.command.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestDetail {
    pub name: String,
    pub description: String,
    pub keywords: Vec<String>,
    pub subtests: Vec<SubtestDetail>,
    pub enriched_keywords: Vec<String>,
    pub full_description: String,
    pub subtest_summary: String,
}

/// Insertion-ordered set of lowercased keywords
#[derive(Default)]
struct KeywordSet {
    seen: HashSet<String>,
    ordered: Vec<String>,
}

impl KeywordSet {
    fn add(&mut self, word: &str) {
        let word = word.to_lowercase();
        if self.seen.insert(word.clone()) {
            self.ordered.push(word);
        }
    }

    /// Words longer than two characters that do not start with a digit.
    fn add_words(&mut self, text: &str) {
        for word in RE_WORD.find_iter(text).map(|m| m.as_str()) {
            let numeric = word.chars().next().is_some_and(|c| c.is_ascii_digit());
            if word.chars().count() > 2 && !numeric {
                self.add(word);
            }
        }
    }

    fn add_technical_terms(&mut self, command: &str) {
        for term in RE_TECHNICAL.find_iter(command).map(|m| m.as_str().trim()) {
            if term.chars().count() > 1 {
                self.add(term);
            }
        }
    }
}

impl TestDetail {
    pub fn from_record(record: &TestRecord) -> Self {
        let mut enriched = KeywordSet::default();
        for keyword in &record.keywords {
            enriched.add(keyword);
        }
        enriched.add_words(&record.description);

        let mut subtest_descriptions = Vec::new();
        for subtest in &record.subtests {
            enriched.add_words(&subtest.name);
            if !subtest.description.is_empty() {
                subtest_descriptions.push(subtest.description.as_str());
                enriched.add_words(&subtest.description);
            }
            enriched.add_technical_terms(&subtest.command);
        }

        Self {
            name: record.name.clone(),
            description: record.description.clone(),
            keywords: record.keywords.clone(),
            subtests: record.subtests.iter().map(SubtestDetail::from).collect(),
            enriched_keywords: enriched.ordered,
            full_description: record.description.clone(),
            subtest_summary: subtest_descriptions.join("; "),
        }
    }
}

// ============================================================================
// Reproduction script
// ============================================================================

/// Dry-run shell script replaying every subtest command of `record`.
///
/// Output paths move under `$TEMP_DIR` and tool names become the configured
/// binaries.
pub fn repro_script(record: &TestRecord, gpac_bin: &str, mp4box_bin: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    out.push(format!("# Repro for: {}", record.name));
    if !record.description.is_empty() {
        out.push(format!("# {}", record.description));
    }
    out.push("set -e".to_string());
    out.push(r#": "${MEDIA_DIR:=./media}""#.to_string());
    out.push(r#": "${EXTERNAL_MEDIA_DIR:=./external_media}""#.to_string());
    out.push(r#": "${TEMP_DIR:=./out}""#.to_string());
    out.push("mkdir -p \"$TEMP_DIR\"\n".to_string());

    for (i, subtest) in record.subtests.iter().enumerate() {
        if subtest.description.is_empty() {
            out.push(format!("# Subtest {}: {}", i + 1, subtest.name));
        } else {
            out.push(format!("# Subtest {}: {} — {}", i + 1, subtest.name, subtest.description));
        }
        let command = RE_OUT_DIR.replace_all(&subtest.command, NoExpand(r#""$TEMP_DIR"/"#));
        let command = RE_TOOL_NAME.replace_all(&command, |caps: &Captures| {
            let bin = if &caps[1] == "MP4Box" { mp4box_bin } else { gpac_bin };
            format!("\"{}\"", bin)
        });
        out.push(command.into_owned());
        out.push(String::new());
    }

    out.join("\n")
}
