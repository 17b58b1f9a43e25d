use serde::Serialize;
use thiserror::Error;

use crate::models::ConflictInfo;

/// Error taxonomy for the engine. Every variant here is a tagged kind the
/// Host is expected to match on, not a string to grep.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum EngineError {
    #[error("preview already in progress")]
    PreviewInProgress,

    #[error("no preview in progress")]
    NoPreview,

    #[error("git {stage} failed (exit {exit_code}): {stderr}")]
    GitFailure {
        stage: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("merge conflict on commit {commit}")]
    MergeConflict {
        commit: String,
        #[serde(skip)]
        info: Box<ConflictInfo>,
    },

    #[error("ledger I/O error at {path}: {cause}")]
    LedgerIo { path: String, cause: String },

    #[error("stale adaptation for origin {origin_hash}")]
    StaleAdaptation { origin_hash: String },

    #[error("llm client unavailable")]
    LlmUnavailable,

    #[error("llm returned an empty response")]
    LlmEmpty,

    #[error("llm error: {cause}")]
    LlmError { cause: String },

    #[error("peer not found: {0}")]
    UnknownPeer(String),

    #[error("invalid working tree path: {0}")]
    InvalidWorkingTree(String),

    #[error("{0}")]
    Other(String),
}

impl From<git2::Error> for EngineError {
    fn from(err: git2::Error) -> Self {
        EngineError::GitFailure {
            stage: "git2".to_string(),
            exit_code: -1,
            stderr: err.message().to_string(),
        }
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::LedgerIo {
            path: String::new(),
            cause: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::LedgerIo {
            path: String::new(),
            cause: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_in_progress_display() {
        let err = EngineError::PreviewInProgress;
        assert_eq!(err.to_string(), "preview already in progress");
    }

    #[test]
    fn test_no_preview_display() {
        let err = EngineError::NoPreview;
        assert_eq!(err.to_string(), "no preview in progress");
    }

    #[test]
    fn test_git_failure_display() {
        let err = EngineError::GitFailure {
            stage: "cherry-pick".to_string(),
            exit_code: 1,
            stderr: "CONFLICT".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "git cherry-pick failed (exit 1): CONFLICT"
        );
    }

    #[test]
    fn test_ledger_io_display() {
        let err = EngineError::LedgerIo {
            path: "/tmp/bob.json".to_string(),
            cause: "permission denied".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "ledger I/O error at /tmp/bob.json: permission denied"
        );
    }

    #[test]
    fn test_stale_adaptation_display() {
        let err = EngineError::StaleAdaptation {
            origin_hash: "deadbeef".to_string(),
        };
        assert_eq!(err.to_string(), "stale adaptation for origin deadbeef");
    }

    #[test]
    fn test_llm_error_display() {
        let err = EngineError::LlmError {
            cause: "timeout".to_string(),
        };
        assert_eq!(err.to_string(), "llm error: timeout");
    }

    #[test]
    fn test_from_git2_error() {
        let git_err = git2::Error::from_str("reference not found");
        let engine_err: EngineError = git_err.into();
        assert!(matches!(engine_err, EngineError::GitFailure { .. }));
        assert!(engine_err.to_string().contains("reference not found"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let engine_err: EngineError = io_err.into();
        assert!(matches!(engine_err, EngineError::LedgerIo { .. }));
        assert!(engine_err.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_result: std::result::Result<serde_json::Value, _> =
            serde_json::from_str("invalid json");
        let json_err = json_result.expect_err("should be an error");
        let engine_err: EngineError = json_err.into();
        assert!(matches!(engine_err, EngineError::LedgerIo { .. }));
    }

    #[test]
    fn test_error_serialization_simple() {
        let err = EngineError::NoPreview;
        let json = serde_json::to_string(&err).expect("should serialize");
        assert!(json.contains("\"type\":\"NoPreview\""));
    }

    #[test]
    fn test_error_serialization_with_data() {
        let err = EngineError::UnknownPeer("bob".to_string());
        let json = serde_json::to_string(&err).expect("should serialize");
        assert!(json.contains("\"type\":\"UnknownPeer\""));
        assert!(json.contains("\"data\":\"bob\""));
    }

    #[test]
    fn test_result_ok() {
        let result: Result<i32> = Ok(42);
        assert!(result.is_ok());
    }

    #[test]
    fn test_result_err() {
        let result: Result<i32> = Err(EngineError::NoPreview);
        assert!(result.is_err());
        assert!(matches!(result, Err(EngineError::NoPreview)));
    }
}
