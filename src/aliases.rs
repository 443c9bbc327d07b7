//! Alias table: script identifier -> free-form topic tags.
//!
//! The table is produced offline and only read here. Enrichment is purely
//! additive; a missing or corrupt table behaves as an empty one.

use crate::corpus::CorpusTest;
use crate::error::FinderError;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::warn;

/// Suffix of the test scripts the corpus refers to
const SCRIPT_SUFFIX: &str = ".sh";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AliasTable {
    entries: HashMap<String, Vec<String>>,
}

impl AliasTable {
    pub fn from_map(entries: HashMap<String, Vec<String>>) -> Self {
        Self { entries }
    }

    pub fn parse(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json).map(Self::from_map)
    }

    pub fn load(path: &Path) -> Result<Self, FinderError> {
        let content = fs::read_to_string(path).map_err(|e| FinderError::AliasRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&content).map_err(|e| FinderError::AliasParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Load the table, degrading to an empty mapping on any failure.
    pub fn load_or_empty(path: &Path) -> Self {
        match Self::load(path) {
            Ok(table) => table,
            Err(e) => {
                warn!("{}; continuing without aliases", e);
                Self::default()
            }
        }
    }

    /// Tags registered for `key`, empty when unknown.
    pub fn tags(&self, key: &str) -> &[String] {
        self.entries.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Map a corpus test to the key its aliases are stored under.
///
/// The key is the script file's base name without the `.sh` suffix; tests
/// that do not name a script fall back to their own name.
pub fn alias_key(test: &CorpusTest) -> String {
    let source = test
        .file
        .as_deref()
        .filter(|f| !f.trim().is_empty())
        .unwrap_or(&test.name);
    let base = source.rsplit('/').next().unwrap_or(source);
    base.strip_suffix(SCRIPT_SUFFIX).unwrap_or(base).to_string()
}
