//! Runtime configuration: file locations, tool binaries, limits and timeouts.
//!
//! Paths resolve in order: explicit value, environment variable, file in the
//! current directory, file under `~/.cache/gpac-recipe-finder/`.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

// ============================================================================
// Constants
// ============================================================================

/// Default corpus document name
pub const CORPUS_FILE: &str = "all_tests_descriptions.xml";

/// Default alias table name
pub const ALIASES_FILE: &str = "aliases.json";

/// Default scripts directory name
pub const SCRIPTS_DIR: &str = "scripts";

/// Cache directory name under ~/.cache/
pub const CACHE_DIR: &str = "gpac-recipe-finder";

/// Commands returned when the request carries no limit
pub const DEFAULT_LIMIT: usize = 5;

/// Hard maximum of commands returned per query
pub const MAX_LIMIT: usize = 10;

/// Tests returned per page when no limit is given
pub const DEFAULT_TEST_LIMIT: usize = 10;

/// Hard maximum of tests per page
pub const MAX_TEST_LIMIT: usize = 50;

/// Description truncation for test summaries
pub const MAX_DESC_CHARS: usize = 220;

/// Description truncation for command results
pub const FIND_MAX_DESC_CHARS: usize = 180;

/// Option probes allowed per returned command
pub const PROBES_PER_COMMAND: usize = 8;

/// Timeouts for the tool's self-documentation calls
#[derive(Debug, Clone, Copy)]
pub struct HelpTimeouts {
    /// Full filter/option listing
    pub full_listing: Duration,
    /// Global options, per-component help and companion-tool groups
    pub section: Duration,
    /// Targeted component.option probe
    pub probe: Duration,
}

impl Default for HelpTimeouts {
    fn default() -> Self {
        Self {
            full_listing: Duration::from_secs(30),
            section: Duration::from_secs(5),
            probe: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub corpus_path: PathBuf,
    pub aliases_path: PathBuf,
    pub scripts_dir: PathBuf,
    /// Filter-graph tool binary
    pub gpac_bin: String,
    /// Companion muxing tool binary
    pub mp4box_bin: String,
    pub timeouts: HelpTimeouts,
}

impl Config {
    /// Build a configuration from environment variables and defaults.
    pub fn from_env() -> Self {
        Self {
            corpus_path: resolve_path("XML_TESTS_PATH", CORPUS_FILE),
            aliases_path: resolve_path("ALIASES_PATH", ALIASES_FILE),
            scripts_dir: resolve_path("SCRIPTS_DIR", SCRIPTS_DIR),
            gpac_bin: env::var("GPAC").unwrap_or_else(|_| "gpac".to_string()),
            mp4box_bin: env::var("MP4BOX").unwrap_or_else(|_| "MP4Box".to_string()),
            timeouts: HelpTimeouts::default(),
        }
    }

    /// Apply explicit overrides (CLI flags) on top of the environment.
    pub fn with_overrides(
        mut self,
        corpus: Option<PathBuf>,
        aliases: Option<PathBuf>,
        scripts: Option<PathBuf>,
    ) -> Self {
        if let Some(path) = corpus {
            self.corpus_path = path;
        }
        if let Some(path) = aliases {
            self.aliases_path = path;
        }
        if let Some(path) = scripts {
            self.scripts_dir = path;
        }
        self
    }
}

/// Clamp a requested limit into `[1, max]`, substituting `default` when absent.
pub fn clamp_limit(requested: Option<usize>, default: usize, max: usize) -> usize {
    requested.unwrap_or(default).clamp(1, max)
}

fn resolve_path(env_key: &str, file_name: &str) -> PathBuf {
    if let Ok(value) = env::var(env_key) {
        if !value.trim().is_empty() {
            return PathBuf::from(value);
        }
    }
    let local = PathBuf::from(file_name);
    if local.exists() {
        return local;
    }
    match cache_dir() {
        Some(dir) if dir.join(file_name).exists() => dir.join(file_name),
        _ => local,
    }
}

/// Get the per-user cache directory holding default artifacts
pub fn cache_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".cache").join(CACHE_DIR))
}
