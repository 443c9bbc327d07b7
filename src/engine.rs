//! End-to-end query pipeline over the loaded corpus and tool documentation.
//!
//! Everything is built once at load time and only read afterwards. A goal
//! goes decompose → rank → pool → dedupe → clean → validate, synchronously.

use crate::aliases::AliasTable;
use crate::cleaner::clean_command;
use crate::config::{
    clamp_limit, Config, DEFAULT_LIMIT, DEFAULT_TEST_LIMIT, FIND_MAX_DESC_CHARS, MAX_DESC_CHARS,
    MAX_LIMIT, MAX_TEST_LIMIT, PROBES_PER_COMMAND,
};
use crate::corpus::Corpus;
use crate::detail::{repro_script, truncate_chars, TestDetail, TestPage};
use crate::error::FinderError;
use crate::index::{IndexStats, TestIndex};
use crate::pool::{assemble_pool, dedupe_and_truncate, CandidateCommand};
use crate::query::decompose_query;
use crate::scoring::rank_tests;
use crate::scripts::ScriptStore;
use crate::tool::runner::ProcessHelpSource;
use crate::tool::ToolDocs;
use crate::validator::{validate_command, ProbeBudget, ValidationIssue, ValidationResult};
use serde::Serialize;
use std::cell::OnceCell;
use tracing::{debug, info};

/// Error code of the strict no-match outcome
pub const NO_MATCH: &str = "NO_MATCH";

/// Confidence thresholds on the command score
struct ConfidenceThresholds {
    /// Score >= this is HIGH confidence
    high: i32,
    /// Score >= this (but < high) is MEDIUM confidence
    medium: i32,
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self { high: 18, medium: 8 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Confidence {
    /// Several strong fields agree with the query
    High,
    Medium,
    /// Incidental command-text or bonus match only
    Low,
}

impl Confidence {
    pub fn from_score(score: i32) -> Self {
        let thresholds = ConfidenceThresholds::default();
        if score >= thresholds.high {
            Confidence::High
        } else if score >= thresholds.medium {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "HIGH",
            Confidence::Medium => "MEDIUM",
            Confidence::Low => "LOW",
        }
    }
}

/// One returned command, cleaned and validated
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult {
    pub test: String,
    pub subtest: String,
    pub description: String,
    pub command: String,
    /// Corpus command, only when cleaning changed it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_command: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub changes: Vec<String>,
    pub score: i32,
    pub confidence: Confidence,
    pub validated: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub validation_errors: Vec<ValidationIssue>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub validation_warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum FindResponse {
    Found {
        total: usize,
        commands: Vec<CommandResult>,
        note: String,
    },
    NoMatch {
        error: String,
        query: String,
    },
}

impl FindResponse {
    fn no_match(query: &str) -> Self {
        FindResponse::NoMatch {
            error: NO_MATCH.to_string(),
            query: query.to_string(),
        }
    }

    pub fn is_no_match(&self) -> bool {
        matches!(self, FindResponse::NoMatch { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStats {
    #[serde(flatten)]
    pub index: IndexStats,
    pub scripts: usize,
}

pub struct Engine {
    config: Config,
    index: TestIndex,
    docs: ToolDocs,
    scripts: OnceCell<ScriptStore>,
}

impl Engine {
    /// Load corpus and aliases from the configured paths; the real tools
    /// are introspected lazily.
    pub fn load(config: Config) -> Self {
        let corpus = Corpus::load_or_empty(&config.corpus_path);
        let aliases = AliasTable::load_or_empty(&config.aliases_path);
        let docs = ToolDocs::new(Box::new(ProcessHelpSource), &config);
        Self::from_parts(config, &corpus, &aliases, docs)
    }

    pub fn from_parts(config: Config, corpus: &Corpus, aliases: &AliasTable, docs: ToolDocs) -> Self {
        Self {
            index: TestIndex::build(corpus, aliases),
            config,
            docs,
            scripts: OnceCell::new(),
        }
    }

    pub fn docs(&self) -> &ToolDocs {
        &self.docs
    }

    /// Shell scripts, loaded on first use.
    pub fn scripts(&self) -> &ScriptStore {
        self.scripts
            .get_or_init(|| ScriptStore::load_or_empty(&self.config.scripts_dir))
    }

    /// Best verified commands for a free-text goal, or NO_MATCH.
    pub fn find_commands(&self, goal: &str, limit: Option<usize>) -> FindResponse {
        let limit = clamp_limit(limit, DEFAULT_LIMIT, MAX_LIMIT);
        let tokens = decompose_query(goal);
        if tokens.is_empty() {
            debug!("No significant tokens in goal");
            return FindResponse::no_match(goal);
        }
        debug!("Tokens: {:?}", tokens);

        let ranked = rank_tests(&self.index, &tokens);
        let pool = assemble_pool(&ranked, &tokens, goal);
        let top = dedupe_and_truncate(pool, limit, MAX_LIMIT);
        if top.is_empty() {
            info!("No match for goal ({} ranked tests)", ranked.len());
            return FindResponse::no_match(goal);
        }

        let mut budget = ProbeBudget::new(limit * PROBES_PER_COMMAND);
        let commands: Vec<CommandResult> = top
            .into_iter()
            .map(|candidate| self.to_result(candidate, &mut budget))
            .collect();
        debug!("Probe budget left: {}", budget.remaining());

        FindResponse::Found {
            total: commands.len(),
            note: format!("Found {} relevant command(s).", commands.len()),
            commands,
        }
    }

    fn to_result(&self, candidate: CandidateCommand, budget: &mut ProbeBudget) -> CommandResult {
        let cleaned = clean_command(&candidate.command);
        let validation = validate_command(&self.docs, &cleaned.cleaned, budget);
        let original_command = cleaned.is_changed().then(|| candidate.command.clone());

        CommandResult {
            description: truncate_chars(&candidate.description, FIND_MAX_DESC_CHARS),
            test: candidate.test,
            subtest: candidate.subtest,
            command: cleaned.cleaned,
            original_command,
            changes: cleaned.changes,
            confidence: Confidence::from_score(candidate.score),
            score: candidate.score,
            validated: validation.valid,
            validation_errors: validation.errors,
            validation_warnings: validation.warnings,
        }
    }

    /// Stage-1 ranked test search over raw keywords, paginated.
    pub fn find_tests(
        &self,
        keywords: &[String],
        limit: Option<usize>,
        offset: usize,
        include_subtests: bool,
    ) -> TestPage {
        let limit = clamp_limit(limit, DEFAULT_TEST_LIMIT, MAX_TEST_LIMIT);
        let keywords: Vec<String> = keywords
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect();
        if keywords.is_empty() {
            return TestPage::error(offset, limit, "No valid keywords provided");
        }

        let ranked = rank_tests(&self.index, &keywords);
        TestPage::paginate(
            ranked.iter().map(|r| r.test),
            offset,
            limit,
            include_subtests,
            MAX_DESC_CHARS,
        )
    }

    pub fn list_tests(&self, limit: Option<usize>, offset: usize, include_subtests: bool) -> TestPage {
        let limit = clamp_limit(limit, DEFAULT_TEST_LIMIT, MAX_TEST_LIMIT);
        TestPage::paginate(
            self.index.records().iter(),
            offset,
            limit,
            include_subtests,
            MAX_DESC_CHARS,
        )
    }

    pub fn test_detail(&self, name: &str) -> Result<TestDetail, FinderError> {
        self.index
            .get(name)
            .map(TestDetail::from_record)
            .ok_or_else(|| FinderError::UnknownTest(name.to_string()))
    }

    pub fn repro_script(&self, name: &str) -> Result<String, FinderError> {
        let record = self
            .index
            .get(name)
            .ok_or_else(|| FinderError::UnknownTest(name.to_string()))?;
        Ok(repro_script(record, &self.config.gpac_bin, &self.config.mp4box_bin))
    }

    /// Validate one command with a single command's probe budget.
    pub fn validate(&self, command: &str) -> ValidationResult {
        let mut budget = ProbeBudget::new(PROBES_PER_COMMAND);
        validate_command(&self.docs, command, &mut budget)
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            index: self.index.stats().clone(),
            scripts: self.scripts().len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::{CorpusSubtest, CorpusTest};
    use crate::tool::runner::UnavailableHelpSource;
    use crate::tool::testing::FakeHelpSource;
    use crate::validator::IssueKind;
    use std::fs;
    use std::path::PathBuf;

    fn subtest(name: &str, description: &str, command: &str) -> CorpusSubtest {
        CorpusSubtest {
            name: name.into(),
            description: (!description.is_empty()).then(|| description.to_string()),
            keywords: vec![],
            command: command.into(),
        }
    }

    fn corpus_test(name: &str, description: &str, keywords: &[&str], subtests: Vec<CorpusSubtest>) -> CorpusTest {
        CorpusTest {
            name: name.into(),
            description: (!description.is_empty()).then(|| description.to_string()),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            file: None,
            subtests,
        }
    }

    fn config() -> Config {
        Config::from_env().with_overrides(
            Some(PathBuf::from("/nonexistent/corpus.xml")),
            Some(PathBuf::from("/nonexistent/aliases.json")),
            Some(PathBuf::from("/nonexistent/scripts")),
        )
    }

    fn offline_engine(tests: Vec<CorpusTest>) -> Engine {
        let config = config();
        let docs = ToolDocs::new(Box::new(UnavailableHelpSource), &config);
        Engine::from_parts(config, &Corpus::from_tests(tests), &AliasTable::default(), docs)
    }

    fn aac_sbr_dash_corpus() -> Vec<CorpusTest> {
        vec![corpus_test(
            "aac-sbr",
            "",
            &["aac"],
            vec![subtest("dash", "", "MP4Box -dash 1000 counter.264")],
        )]
    }

    fn commands(response: &FindResponse) -> &[CommandResult] {
        match response {
            FindResponse::Found { commands, .. } => commands,
            FindResponse::NoMatch { .. } => panic!("unexpected NO_MATCH"),
        }
    }

    #[test]
    fn test_single_candidate_is_cleaned() {
        let engine = offline_engine(aac_sbr_dash_corpus());
        let response = engine.find_commands("dash", None);
        let results = commands(&response);

        assert_eq!(results.len(), 1);
        let result = &results[0];
        assert_eq!(result.test, "aac-sbr");
        assert_eq!(result.command, "MP4Box -dash 1000 input.h264");
        assert_eq!(result.original_command.as_deref(), Some("MP4Box -dash 1000 counter.264"));
        assert_eq!(result.changes.len(), 1);
        assert_eq!(result.score, 19);
        assert_eq!(result.confidence, Confidence::High);
    }

    #[test]
    fn test_empty_goal_is_no_match() {
        let engine = offline_engine(aac_sbr_dash_corpus());
        for goal in ["", "   ", "how do I"] {
            let response = engine.find_commands(goal, Some(5));
            assert!(response.is_no_match(), "{goal:?}");
            let json = serde_json::to_value(&response).unwrap();
            assert_eq!(json["error"], "NO_MATCH");
            assert_eq!(json["query"], goal);
        }
    }

    #[test]
    fn test_unmatched_goal_is_no_match() {
        let engine = offline_engine(aac_sbr_dash_corpus());
        assert!(engine.find_commands("teletext subtitles", None).is_no_match());
    }

    #[test]
    fn test_name_match_ranks_first() {
        let engine = offline_engine(vec![
            corpus_test("other", "how to encrypt files", &[], vec![subtest("b", "", "gpac -i a.mp4 -o b.mp4")]),
            corpus_test(
                "encrypt-cenc",
                "encrypt with cenc",
                &[],
                vec![subtest("a", "", "MP4Box -crypt drm.xml input.mp4")],
            ),
        ]);
        let page = engine.find_tests(&["encrypt".to_string()], None, 0, false);
        assert_eq!(page.total, 2);
        assert_eq!(page.tests[0].name, "encrypt-cenc");
        assert_eq!(page.tests[1].name, "other");

        let response = engine.find_commands("encrypt", None);
        assert_eq!(commands(&response)[0].test, "encrypt-cenc");
    }

    #[test]
    fn test_unknown_component_fails_validation() {
        let config = config();
        let source = FakeHelpSource::default()
            .answer("-ha filters", "inspect: Inspect packets\n -deep (bool): dump packets\n");
        let docs = ToolDocs::new(Box::new(source), &config);
        let engine = Engine::from_parts(
            config,
            &Corpus::from_tests(vec![corpus_test(
                "inspect-bad",
                "",
                &["inspect"],
                vec![subtest("run", "", "gpac -i counter.mp4 foobar:opt=1 -o out.mp4")],
            )]),
            &AliasTable::default(),
            docs,
        );

        let response = engine.find_commands("inspect", None);
        let result = &commands(&response)[0];
        assert!(!result.validated);
        assert_eq!(result.validation_errors.len(), 1);
        assert_eq!(result.validation_errors[0].kind, IssueKind::Filter);
        assert_eq!(result.validation_errors[0].component.as_deref(), Some("foobar"));
    }

    #[test]
    fn test_unavailable_documentation_fails_open() {
        let engine = offline_engine(vec![corpus_test(
            "mixed",
            "dash inspect",
            &["dash"],
            vec![
                subtest("a", "", "gpac -i input.mp4 foobar:opt=1 -o out.mpd"),
                subtest("b", "", "MP4Box -dash 1000 -nosuch input.mp4"),
                subtest("c", "", "gpac -i input.mp4 inspect:deep"),
            ],
        )]);
        let response = engine.find_commands("dash", Some(10));
        let results = commands(&response);
        assert_eq!(results.len(), 3);
        for result in results {
            assert!(result.validated, "{}", result.command);
            assert!(result.validation_errors.is_empty());
            assert!(!result.validation_warnings.is_empty());
        }
    }

    #[test]
    fn test_limit_is_clamped() {
        let subtests = (0..15)
            .map(|i| subtest(&format!("s{i}"), "", &format!("MP4Box -dash {i} input.mp4")))
            .collect();
        let engine = offline_engine(vec![corpus_test("many", "", &["dash"], subtests)]);
        assert_eq!(commands(&engine.find_commands("dash", Some(50))).len(), MAX_LIMIT);
        assert_eq!(commands(&engine.find_commands("dash", Some(0))).len(), 1);
        assert_eq!(commands(&engine.find_commands("dash", None)).len(), DEFAULT_LIMIT);
    }

    #[test]
    fn test_result_json_shape() {
        let engine = offline_engine(aac_sbr_dash_corpus());
        let json = serde_json::to_value(engine.find_commands("dash", None)).unwrap();
        assert_eq!(json["total"], 1);
        assert_eq!(json["note"], "Found 1 relevant command(s).");
        let first = &json["commands"][0];
        assert_eq!(first["confidence"], "HIGH");
        assert_eq!(first["validated"], true);
        assert!(first.get("originalCommand").is_some());
        assert!(first.get("validationErrors").is_none());
    }

    #[test]
    fn test_find_tests_rejects_blank_keywords() {
        let engine = offline_engine(aac_sbr_dash_corpus());
        let page = engine.find_tests(&["  ".to_string(), String::new()], Some(3), 0, false);
        assert_eq!(page.error.as_deref(), Some("No valid keywords provided"));
        assert_eq!(page.limit, 3);
        assert!(page.tests.is_empty());
    }

    #[test]
    fn test_list_detail_and_repro() {
        let engine = offline_engine(aac_sbr_dash_corpus());
        let page = engine.list_tests(None, 0, true);
        assert_eq!(page.total, 1);
        assert_eq!(page.limit, DEFAULT_TEST_LIMIT);

        let detail = engine.test_detail("aac-sbr").unwrap();
        assert_eq!(detail.subtests[0].command, "MP4Box -dash 1000 counter.264");
        assert!(matches!(engine.test_detail("nope"), Err(FinderError::UnknownTest(_))));

        let script = engine.repro_script("aac-sbr").unwrap();
        assert!(script.starts_with("# Repro for: aac-sbr\nset -e"));
        assert!(engine.repro_script("nope").is_err());
    }

    #[test]
    fn test_scripts_load_lazily_from_config() {
        let dir = tempfile::TempDir::new().unwrap();
        fs::write(dir.path().join("a.sh"), "echo a\n").unwrap();
        let config = Config::from_env().with_overrides(None, None, Some(dir.path().to_path_buf()));
        let docs = ToolDocs::new(Box::new(UnavailableHelpSource), &config);
        let engine = Engine::from_parts(config, &Corpus::default(), &AliasTable::default(), docs);

        assert_eq!(engine.scripts().len(), 1);
        let stats = engine.stats();
        assert_eq!(stats.scripts, 1);
        assert_eq!(stats.index.tests, 0);
    }

    #[test]
    fn test_confidence_levels() {
        assert_eq!(Confidence::from_score(18), Confidence::High);
        assert_eq!(Confidence::from_score(17), Confidence::Medium);
        assert_eq!(Confidence::from_score(8), Confidence::Medium);
        assert_eq!(Confidence::from_score(7), Confidence::Low);
        assert_eq!(Confidence::Low.as_str(), "LOW");
    }
}
