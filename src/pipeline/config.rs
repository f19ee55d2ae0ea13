// src/pipeline/config.rs

use derive_builder::Builder;

use super::types::{PipelineError, Result};

#[derive(Debug, Clone, Builder)]
#[builder(setter(into))]
pub struct PipelineConfig {
    /// Admission queue capacity of each stage, in stage order
    pub(crate) concurrency: Vec<usize>,

    /// Capacity of the result-delivery queue
    #[builder(default = "1")]
    pub(crate) output_buffer: usize,

    /// Discard final outputs instead of delivering them
    #[builder(default = "false")]
    pub(crate) suppress_output: bool,
}

impl PipelineConfig {
    /// Creates a config with one concurrency limit per stage and defaults
    /// for everything else.
    pub fn new(concurrency: impl Into<Vec<usize>>) -> Self {
        PipelineConfig {
            concurrency: concurrency.into(),
            output_buffer: 1,
            suppress_output: false,
        }
    }

    /// Returns the number of stages
    #[inline]
    pub fn stage_count(&self) -> usize {
        self.concurrency.len()
    }

    /// Returns the admission queue capacity of each stage
    #[inline]
    pub fn concurrency(&self) -> &[usize] {
        &self.concurrency
    }

    /// Returns the capacity of the result-delivery queue
    #[inline]
    pub fn output_buffer(&self) -> usize {
        self.output_buffer
    }

    /// Returns whether final outputs are discarded
    #[inline]
    pub fn suppress_output(&self) -> bool {
        self.suppress_output
    }

    /// Checks the config against the number of task providers supplied.
    pub(crate) fn validate(&self, providers: usize) -> Result<()> {
        if self.concurrency.is_empty() {
            return Err(PipelineError::InvalidStageCount);
        }
        if providers != self.concurrency.len() {
            return Err(PipelineError::ProviderMismatch {
                expected: self.concurrency.len(),
                actual: providers,
            });
        }
        if let Some(stage) = self.concurrency.iter().position(|&limit| limit == 0) {
            return Err(PipelineError::ZeroConcurrency { stage });
        }
        if self.output_buffer == 0 {
            return Err(PipelineError::ZeroOutputBuffer);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = PipelineConfigBuilder::default()
            .concurrency(vec![3usize, 2, 3])
            .build()
            .unwrap();

        assert_eq!(config.stage_count(), 3);
        assert_eq!(config.concurrency(), &[3, 2, 3]);
        assert_eq!(config.output_buffer(), 1);
        assert!(!config.suppress_output());
    }

    #[test]
    fn test_builder_requires_concurrency() {
        let result = PipelineConfigBuilder::default().output_buffer(4usize).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_validate() {
        let config = PipelineConfig::new(vec![1, 2]);
        assert!(config.validate(2).is_ok());

        assert!(matches!(
            config.validate(3),
            Err(PipelineError::ProviderMismatch {
                expected: 2,
                actual: 3
            })
        ));

        assert!(matches!(
            PipelineConfig::new(Vec::new()).validate(0),
            Err(PipelineError::InvalidStageCount)
        ));

        assert!(matches!(
            PipelineConfig::new(vec![4, 0, 1]).validate(3),
            Err(PipelineError::ZeroConcurrency { stage: 1 })
        ));

        let mut config = PipelineConfig::new(vec![1]);
        config.output_buffer = 0;
        assert!(matches!(
            config.validate(1),
            Err(PipelineError::ZeroOutputBuffer)
        ));
    }
}
