use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FinderError {
    #[error("Failed to read stdin: {0}")]
    StdinRead(#[from] io::Error),

    #[error("Failed to parse request JSON: {0}")]
    RequestParse(#[from] serde_json::Error),

    #[error("Failed to read test corpus from {path}: {source}")]
    CorpusRead { path: PathBuf, source: io::Error },

    #[error("Failed to parse test corpus {path}: {message}")]
    CorpusParse { path: PathBuf, message: String },

    #[error("Failed to read alias table from {path}: {source}")]
    AliasRead { path: PathBuf, source: io::Error },

    #[error("Failed to parse alias table {path}: {message}")]
    AliasParse { path: PathBuf, message: String },

    #[error("Scripts directory not found at {0}")]
    ScriptsDirNotFound(PathBuf),

    #[error("Script not loaded: {0}")]
    ScriptNotLoaded(String),

    #[error("Invalid line range {start}..={end}")]
    InvalidLineRange { start: usize, end: usize },

    #[error("Invalid search pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("Unknown test: {0}")]
    UnknownTest(String),
}
