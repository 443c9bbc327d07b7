//! In-memory copy of the test-suite shell scripts, for segment reads and search.

use crate::error::FinderError;
use regex::RegexBuilder;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextLine {
    pub line: usize,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptMatch {
    pub file: String,
    pub line: usize,
    #[serde(rename = "match")]
    pub matched: String,
    pub context: Vec<ContextLine>,
}

#[derive(Debug, Clone, Default)]
pub struct ScriptStore {
    root: PathBuf,
    /// Path relative to `root` -> file contents
    scripts: BTreeMap<String, String>,
}

impl ScriptStore {
    /// Load every `*.sh` under `dir`, recursively.
    pub fn load(dir: &Path) -> Result<Self, FinderError> {
        if !dir.is_dir() {
            return Err(FinderError::ScriptsDirNotFound(dir.to_path_buf()));
        }

        let mut scripts = BTreeMap::new();
        for entry in WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();
            if !entry.file_type().is_file() || path.extension().and_then(|e| e.to_str()) != Some("sh") {
                continue;
            }
            match fs::read_to_string(path) {
                Ok(content) => {
                    let key = path
                        .strip_prefix(dir)
                        .unwrap_or(path)
                        .to_string_lossy()
                        .replace('\\', "/");
                    scripts.insert(key, content);
                }
                Err(e) => warn!("[SCRIPTS] Failed to load script {}: {}", path.display(), e),
            }
        }

        info!("[SCRIPTS] Loaded {} scripts from {}", scripts.len(), dir.display());
        Ok(Self {
            root: dir.to_path_buf(),
            scripts,
        })
    }

    /// Load, or an empty store with a diagnostic.
    pub fn load_or_empty(dir: &Path) -> Self {
        match Self::load(dir) {
            Ok(store) => store,
            Err(e) => {
                warn!("[SCRIPTS] {}", e);
                Self::default()
            }
        }
    }

    pub fn files(&self) -> impl Iterator<Item = &str> {
        self.scripts.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }

    /// Accepts the relative key or the path as joined onto the root.
    fn content(&self, path: &str) -> Option<&String> {
        self.scripts.get(path).or_else(|| {
            Path::new(path)
                .strip_prefix(&self.root)
                .ok()
                .and_then(|rel| self.scripts.get(rel.to_string_lossy().as_ref()))
        })
    }

    /// Lines `start..=end` (1-based) of a loaded script, clamped to its length.
    pub fn read_segment(&self, path: &str, start: usize, end: usize) -> Result<String, FinderError> {
        if start == 0 || end < start {
            return Err(FinderError::InvalidLineRange { start, end });
        }
        let content = self
            .content(path)
            .ok_or_else(|| FinderError::ScriptNotLoaded(path.to_string()))?;

        let lines: Vec<&str> = content.split('\n').collect();
        let from = (start - 1).min(lines.len());
        let to = end.min(lines.len());
        Ok(lines[from..to].join("\n"))
    }

    /// Case-insensitive regex search with `context` lines around each hit.
    pub fn search(&self, pattern: &str, context: usize) -> Result<Vec<ScriptMatch>, FinderError> {
        let re = RegexBuilder::new(pattern).case_insensitive(true).build()?;

        let mut results = Vec::new();
        for (file, content) in &self.scripts {
            let lines: Vec<&str> = content.split('\n').collect();
            for (idx, line) in lines.iter().enumerate() {
                if !re.is_match(line) {
                    continue;
                }
                let first = idx.saturating_sub(context);
                let last = (idx + context).min(lines.len() - 1);
                results.push(ScriptMatch {
                    file: file.clone(),
                    line: idx + 1,
                    matched: line.trim().to_string(),
                    context: (first..=last)
                        .map(|i| ContextLine {
                            line: i + 1,
                            content: lines[i].to_string(),
                        })
                        .collect(),
                });
            }
        }
        Ok(results)
    }
}
