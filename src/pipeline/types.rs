use thiserror::Error;

use super::config::PipelineConfigBuilderError;

/// Errors reported while constructing a pipeline.
///
/// Once a pipeline is running nothing is reported: jobs a task rejects are
/// dropped silently.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid stage count: a pipeline needs at least one stage")]
    InvalidStageCount,

    #[error("expected {expected} concurrency limits, got {actual}")]
    ConcurrencyMismatch { expected: usize, actual: usize },

    #[error("expected {expected} task providers, got {actual}")]
    ProviderMismatch { expected: usize, actual: usize },

    /// A stage was given a concurrency limit of zero.
    #[error("stage {stage} has a concurrency limit of zero")]
    ZeroConcurrency { stage: usize },

    #[error("output buffer must hold at least one result")]
    ZeroOutputBuffer,

    #[error("configuration error: {0}")]
    Configuration(String),

    /// Stage loops are tokio tasks, so construction needs a runtime.
    #[error("no tokio runtime available")]
    NoRuntime,
}

impl From<PipelineConfigBuilderError> for PipelineError {
    fn from(err: PipelineConfigBuilderError) -> Self {
        PipelineError::Configuration(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
