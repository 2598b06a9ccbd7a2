//! Error types for warcry-core

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in warcry-core
#[derive(Debug, Error)]
pub enum Error {
    /// A fragment file could not be decoded or parsed
    #[error("failed to load '{path}': {message}")]
    FileLoad { path: PathBuf, message: String },

    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The data root is missing or not a directory
    #[error("data root '{0}' is not a directory")]
    NotADirectory(PathBuf),

    /// Directory traversal error
    #[error("failed to traverse directory: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// Records that could not be turned into typed entities
    #[error("{} invalid record(s):\n{}", .0.len(), Problems(.0))]
    InvalidRecords(Vec<RecordError>),

    /// Problems found while resolving factions and abilities
    #[error("resolution failed with {} problem(s):\n{}", .0.len(), Problems(.0))]
    Resolution(Vec<String>),

    /// Resolution was requested on a dataset that already carries associations
    #[error("dataset is already resolved; reset associations before resolving again")]
    AlreadyResolved,

    /// An ability key maps to more than one grand alliance
    #[error("ability '{ability}' (warband '{key}') matches several grand alliances: {}", .alliances.join(", "))]
    AmbiguousGrandAlliance {
        ability: String,
        key: String,
        alliances: Vec<String>,
    },

    /// No fighter with the given identifier or name
    #[error("fighter not found: {0}")]
    FighterNotFound(String),

    /// Identifier collisions and unbuildable records found during validation
    #[error("validation failed with {} error(s):\n{}", .0.len(), Problems(.0))]
    Validation(Vec<String>),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    /// CSV writing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A record that failed typed construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordError {
    /// Collection the record belongs to ("fighters", "abilities", "factions")
    pub collection: &'static str,
    /// Position of the record in its collection
    pub index: usize,
    /// Record name, if it had one
    pub name: Option<String>,
    /// What was wrong with it
    pub message: String,
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(
                f,
                "{}[{}] '{}': {}",
                self.collection, self.index, name, self.message
            ),
            None => write!(f, "{}[{}]: {}", self.collection, self.index, self.message),
        }
    }
}

/// Renders a list of problems one per line
struct Problems<'a, T>(&'a [T]);

impl<T: fmt::Display> fmt::Display for Problems<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, problem) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "  - {}", problem)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_problem_is_listed() {
        let err = Error::Validation(vec!["fighters: a1".into(), "abilities: b2".into()]);
        let text = err.to_string();
        assert!(text.starts_with("validation failed with 2 error(s)"));
        assert!(text.contains("  - fighters: a1"));
        assert!(text.contains("  - abilities: b2"));
    }

    #[test]
    fn test_record_error_display() {
        let err = RecordError {
            collection: "fighters",
            index: 3,
            name: Some("Knight-Arcanum".into()),
            message: "missing field 'warband'".into(),
        };
        assert_eq!(
            err.to_string(),
            "fighters[3] 'Knight-Arcanum': missing field 'warband'"
        );
    }
}
