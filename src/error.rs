//! The extraction error taxonomy (C9, §7).
//!
//! Everything below the per-file boundary is caught and logged; only
//! [`ExtractError::ParseFatal`] ever escapes a call, and only from the
//! Parser Manager.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    /// The tree cannot be built at all. The file is skipped.
    #[error("failed to parse {path} as {language}: {reason}")]
    ParseFatal {
        path: PathBuf,
        language: String,
        reason: String,
    },

    /// A single declaration could not be extracted; its siblings still are.
    #[error("malformed node in {path}{}: {reason}", line.map(|l| format!(":{l}")).unwrap_or_default())]
    NodeMalformed {
        path: PathBuf,
        line: Option<u32>,
        reason: String,
    },

    /// Two symbols in one file hashed to the same id; the second was
    /// perturbed deterministically.
    #[error("id collision in {path}{}: {name}", line.map(|l| format!(":{l}")).unwrap_or_default())]
    IdCollision {
        path: PathBuf,
        line: Option<u32>,
        name: String,
    },

    /// A relationship's target resolved to neither a local symbol nor a
    /// known external token. Non-fatal: the edge is still emitted.
    #[error("unresolved relationship target in {path}{}: {target}", line.map(|l| format!(":{l}")).unwrap_or_default())]
    RelationshipUnresolved {
        path: PathBuf,
        line: Option<u32>,
        target: String,
    },

    /// The per-file soft deadline (§5, §4.8) was exceeded; partial results
    /// are returned with `metadata.truncated = true`.
    #[error("extraction of {path} truncated after deadline")]
    TruncatedExtraction { path: PathBuf },

    #[error("failed to read {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid configuration: {reason}")]
    Config { reason: String },

    #[error("{0}")]
    General(String),
}

pub type ExtractResult<T> = Result<T, ExtractError>;

/// Adds file/path context to a foreign error, converting it into an
/// [`ExtractError::General`].
pub trait ErrorContext<T> {
    fn context(self, msg: &str) -> Result<T, ExtractError>;
    fn with_path(self, path: &std::path::Path) -> Result<T, ExtractError>;
}

impl<T, E> ErrorContext<T> for Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, msg: &str) -> Result<T, ExtractError> {
        self.map_err(|e| ExtractError::General(format!("{msg}: {e}")))
    }

    fn with_path(self, path: &std::path::Path) -> Result<T, ExtractError> {
        self.map_err(|e| ExtractError::General(format!("error processing '{}': {e}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fatal_display() {
        let err = ExtractError::ParseFatal {
            path: PathBuf::from("a.rs"),
            language: "rust".to_string(),
            reason: "unexpected EOF".to_string(),
        };
        assert!(err.to_string().contains("a.rs"));
        assert!(err.to_string().contains("unexpected EOF"));
    }

    #[test]
    fn test_node_malformed_with_and_without_line() {
        let with_line = ExtractError::NodeMalformed {
            path: PathBuf::from("a.rs"),
            line: Some(12),
            reason: "bad field".to_string(),
        };
        assert!(with_line.to_string().contains(":12"));

        let without_line = ExtractError::NodeMalformed {
            path: PathBuf::from("a.rs"),
            line: None,
            reason: "bad field".to_string(),
        };
        assert!(!without_line.to_string().contains(":None"));
    }

    #[test]
    fn test_error_context() {
        let result: Result<(), std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "missing"));
        let wrapped = result.context("loading settings");
        assert!(wrapped.is_err());
        assert!(wrapped.unwrap_err().to_string().contains("loading settings"));
    }
}
