//! Error types for the planning worker
//!
//! Errors are classified by how the pipeline recovers from them:
//! - Input: malformed events/dates, recovered locally with a safe default
//! - Collaborator: external estimate/service failure, recovered with a
//!   documented fallback value and a visible warning
//! - Stage: an error escaping a stage's recoverable paths, fatal for the job
//! - Timeout/Cancelled: dedicated kinds so observers can tell them apart

use thiserror::Error;

/// Errors produced while planning a single job.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("Invalid input: {0}")]
    Input(String),

    #[error("Collaborator failure: {0}")]
    Collaborator(String),

    #[error("{stage} failed: {message}")]
    Stage { stage: &'static str, message: String },

    #[error("Job timed out after {0} seconds")]
    Timeout(u64),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Job cancelled during shutdown")]
    Cancelled,

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Enrichment planner unavailable: {0}")]
    EnrichmentUnavailable(String),
}

impl PlanError {
    /// Returns true if this error ends the job without a FAILED status write
    /// (shutdown cancellation must not overwrite already-committed state).
    pub fn is_cancellation(&self) -> bool {
        matches!(self, PlanError::Cancelled)
    }

    /// Returns true if this is the dedicated timeout kind.
    pub fn is_timeout(&self) -> bool {
        matches!(self, PlanError::Timeout(_))
    }

    /// Coarse kind label for serialized failure reports.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PlanError::Input(_) => ErrorKind::Input,
            PlanError::Collaborator(_) => ErrorKind::Collaborator,
            PlanError::Stage { .. } => ErrorKind::Stage,
            PlanError::Timeout(_) => ErrorKind::Timeout,
            PlanError::Configuration(_) => ErrorKind::Configuration,
            PlanError::Cancelled => ErrorKind::Cancelled,
            PlanError::Storage(_) => ErrorKind::Storage,
            PlanError::EnrichmentUnavailable(_) => ErrorKind::Enrichment,
        }
    }
}

/// Serializable error kind for progress payloads and failure reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Input,
    Collaborator,
    Stage,
    Timeout,
    Configuration,
    Cancelled,
    Storage,
    Enrichment,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_is_distinguished() {
        let err = PlanError::Timeout(300);
        assert!(err.is_timeout());
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(err.to_string().contains("300"));
    }

    #[test]
    fn test_cancellation_flag() {
        assert!(PlanError::Cancelled.is_cancellation());
        assert!(!PlanError::Input("bad date".into()).is_cancellation());
    }

    #[test]
    fn test_stage_error_message() {
        let err = PlanError::Stage {
            stage: "Meeting classification",
            message: "boom".into(),
        };
        assert_eq!(err.to_string(), "Meeting classification failed: boom");
        assert_eq!(err.kind(), ErrorKind::Stage);
    }
}
