//! Command cleaning: rewrite test-suite artifacts into user-facing placeholders.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

/// Test fixture file names and path fragments, in application order.
pub const FIXTURE_SUBSTITUTIONS: &[(&str, &str)] = &[
    ("counter.hvc", "input.hevc"),
    ("counter.264", "input.h264"),
    ("counter.mp4", "input.mp4"),
    ("dead_ogg.ogg", "input.ogg"),
    ("bifs-all.bt", "scene.bt"),
    ("counter_30s", "input"),
    ("test.mp4", "input.mp4"),
    ("auxiliary_files/", "media/"),
];

/// Options that only make sense inside the test harness.
pub const TEST_ONLY_OPTIONS: &[&str] = &[
    "!check_dur",
    "subs_sidx",
    ":dur=",
    ":bandwidth=",
    "pssh=",
    "buf=",
];

lazy_static! {
    /// Each test-only option with its leading separator and trailing value.
    static ref TEST_OPTION_PATTERNS: Vec<(&'static str, Regex)> = TEST_ONLY_OPTIONS
        .iter()
        .map(|opt| {
            let prefix = if opt.starts_with(':') { r"\s*" } else { r"\s*(?::|-{1,2})?" };
            let pattern = format!(r"{}{}[^\s:]*", prefix, regex::escape(opt));
            (*opt, Regex::new(&pattern).unwrap())
        })
        .collect();
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanedCommand {
    pub cleaned: String,
    /// One note per substitution or removal performed
    pub changes: Vec<String>,
}

impl CleanedCommand {
    pub fn is_changed(&self) -> bool {
        !self.changes.is_empty()
    }
}

/// Replace fixture names and strip test-only options from `command`.
pub fn clean_command(command: &str) -> CleanedCommand {
    let mut cleaned = command.to_string();
    let mut changes = Vec::new();

    for (fixture, placeholder) in FIXTURE_SUBSTITUTIONS {
        if cleaned.contains(fixture) {
            cleaned = cleaned.replace(fixture, placeholder);
            changes.push(format!("Replaced {} → {}", fixture, placeholder));
        }
    }

    for (opt, pattern) in TEST_OPTION_PATTERNS.iter() {
        if cleaned.contains(opt) {
            cleaned = pattern.replace_all(&cleaned, "").into_owned();
            changes.push(format!("Removed test option: {}", opt));
        }
    }

    CleanedCommand {
        cleaned: cleaned.trim().to_string(),
        changes,
    }
}
