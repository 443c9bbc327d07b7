//! GPAC Recipe Finder
//!
//! Answers "how do I do X with GPAC / MP4Box" with command lines taken from
//! the test-suite corpus:
//! - Two-stage weighted scoring (tests, then their commands)
//! - Strict NO_MATCH policy: no unranked fallback answers
//! - Fixture cleaning of test-suite file names and harness-only options
//! - Static validation against the installed tools' own documentation,
//!   fail-open when the tools cannot be introspected

pub mod aliases;
pub mod cleaner;
pub mod config;
pub mod corpus;
pub mod detail;
pub mod engine;
pub mod error;
pub mod index;
pub mod pool;
pub mod query;
pub mod scoring;
pub mod scripts;
pub mod tool;
pub mod validator;

pub use config::Config;
pub use engine::{CommandResult, Confidence, Engine, FindResponse};
pub use error::FinderError;
pub use validator::{ValidationIssue, ValidationResult};
