use serde::Serialize;

use crate::error::EngineError;
use crate::models::{ConflictInfo, PendingCommit};

/// Result shape for every facade operation that can surface a conflict
/// instead of a hard error: `{ ok, conflict?, conflicting_commit?, error? }`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationOutcome {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflict: Option<ConflictInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflicting_commit: Option<PendingCommit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<EngineError>,
}

impl OperationOutcome {
    pub fn success() -> Self {
        OperationOutcome {
            ok: true,
            conflict: None,
            conflicting_commit: None,
            error: None,
        }
    }

    pub fn conflict(conflict: Option<ConflictInfo>, conflicting_commit: PendingCommit) -> Self {
        OperationOutcome {
            ok: false,
            conflict,
            conflicting_commit: Some(conflicting_commit),
            error: None,
        }
    }

    pub fn failed(error: EngineError) -> Self {
        OperationOutcome {
            ok: false,
            conflict: None,
            conflicting_commit: None,
            error: Some(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_outcome_has_no_extras() {
        let outcome = OperationOutcome::success();
        assert!(outcome.ok);
        assert!(outcome.conflict.is_none());
        assert!(outcome.error.is_none());
    }

    #[test]
    fn test_failed_outcome_carries_error() {
        let outcome = OperationOutcome::failed(EngineError::NoPreview);
        assert!(!outcome.ok);
        assert!(matches!(outcome.error, Some(EngineError::NoPreview)));
    }
}
