//! Error taxonomy for the pipeline.
//!
//! Every variant except [`PipelineError::InvalidInput`] is recoverable:
//! it is absorbed at the stage boundary where it occurs and converted
//! into that stage's fallback path plus a log entry. `InvalidInput` is
//! a caller error and terminates the run with a non-zero exit status.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Network fetch failed; the Collector recovers via the sample corpus.
    #[error("fetch failed: {0}")]
    FetchFailure(String),

    /// The structuring service could not be reached or timed out; the
    /// Structurer recovers via a heuristic record for the segment.
    #[error("structuring service unavailable: {0}")]
    StructuringUnavailable(String),

    /// The structuring output could not be repaired into a valid record.
    #[error("malformed structured output: {0}")]
    MalformedStructuredOutput(String),

    /// The primary store rejected or never received the batch; the
    /// Loader recovers via the fallback CSV artifact.
    #[error("primary store unavailable: {0}")]
    StoreUnavailable(String),

    /// Caller error (e.g. conflicting duplicate ids). Fatal.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Local artifact read/write failed. Fatal: the artifact layer is
    /// the last line of durability and has no further fallback.
    #[error("artifact I/O failed: {0}")]
    Artifact(#[from] std::io::Error),
}

impl PipelineError {
    /// Whether a stage boundary may absorb this error into a fallback path.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            PipelineError::InvalidInput(_) | PipelineError::Artifact(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        assert!(PipelineError::FetchFailure("timeout".into()).is_recoverable());
        assert!(PipelineError::StructuringUnavailable("503".into()).is_recoverable());
        assert!(PipelineError::StoreUnavailable("401".into()).is_recoverable());
        assert!(!PipelineError::InvalidInput("dup id".into()).is_recoverable());
    }

    #[test]
    fn test_display_includes_context() {
        let e = PipelineError::StoreUnavailable("connection refused".into());
        assert!(e.to_string().contains("connection refused"));
    }
}
