//! Error taxonomy for the document indexing pipeline.
//!
//! Mirrors the failure semantics of the orchestrator: terminal errors are
//! recorded against the file and never retried, transient errors are retried
//! with backoff, and enrichment failures degrade gracefully rather than
//! failing the job.

/// Name of the stage a `StageTimeout` occurred in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Load,
    Parse,
    Structure,
    Chunk,
    Enrich,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Load => "load",
            Stage::Parse => "parse",
            Stage::Structure => "structure",
            Stage::Chunk => "chunk",
            Stage::Enrich => "enrich",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("parse failed: {0}")]
    ParseFailed(String),

    #[error("document is empty after parsing")]
    EmptyDocument,

    #[error("transient storage error: {0}")]
    StorageTransient(String),

    #[error("terminal storage error: {0}")]
    StorageTerminal(String),

    #[error("stage '{stage}' exceeded its time budget")]
    StageTimeout { stage: Stage },

    #[error("enrichment degraded: {0}")]
    EnrichmentDegraded(String),

    #[error("persistence failed: {0}")]
    PersistenceFailed(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl PipelineError {
    /// Transient failures are safe to retry with backoff. `StageTimeout`
    /// is retried exactly once by the orchestrator's stage runner rather
    /// than through the backoff loop (spec §7: "retry once, then
    /// terminal"), but is still reported as retryable here for callers
    /// that branch on this predicate.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PipelineError::StorageTransient(_)
                | PipelineError::PersistenceFailed(_)
                | PipelineError::Io(_)
                | PipelineError::StageTimeout { .. }
        )
    }

    /// Deterministic failures are reported against the file without retry.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PipelineError::UnsupportedFormat(_)
                | PipelineError::ParseFailed(_)
                | PipelineError::EmptyDocument
                | PipelineError::StorageTerminal(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_errors_are_not_retryable() {
        let err = PipelineError::UnsupportedFormat("image/png".to_string());
        assert!(err.is_terminal());
        assert!(!err.is_retryable());
    }

    #[test]
    fn transient_errors_are_retryable_not_terminal() {
        let err = PipelineError::StorageTransient("timeout".to_string());
        assert!(err.is_retryable());
        assert!(!err.is_terminal());
    }

    #[test]
    fn stage_timeout_display() {
        let err = PipelineError::StageTimeout { stage: Stage::Chunk };
        assert!(err.to_string().contains("chunk"));
    }

    #[test]
    fn stage_timeout_is_retryable_but_not_terminal() {
        let err = PipelineError::StageTimeout { stage: Stage::Parse };
        assert!(err.is_retryable());
        assert!(!err.is_terminal());
    }
}
