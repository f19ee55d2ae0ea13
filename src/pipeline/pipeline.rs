// src/pipeline/pipeline.rs

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::builder::PipelineBuilder;
use super::config::PipelineConfig;
use super::job::Job;
use super::stage::{Downstream, Sink, Stage, StageLoop};
use super::task::{TaskProvider, Value};
use super::types::{PipelineError, Result};

/// A fixed sequence of concurrently running stages.
///
/// Every pushed value flows from the first stage to the last, the output of
/// one stage becoming the input of the next. Each stage admits at most its
/// concurrency limit of jobs and hands them on in admission order; once its
/// queue is full, submitters wait. Outputs of the last stage appear on the
/// result queue (see [`Pipeline::take_outputs`]) unless output is suppressed.
///
/// Dropping the pipeline closes it.
pub struct Pipeline {
    stages: Vec<Arc<Stage>>,
    concurrency: Vec<usize>,
    outputs: Option<mpsc::Receiver<Value>>,
    suppressed: Arc<AtomicBool>,
    shutdown: CancellationToken,
    next_job: AtomicU64,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("concurrency", &self.concurrency)
            .field("suppressed", &self.suppressed.load(Ordering::Relaxed))
            .field("closed", &self.shutdown.is_cancelled())
            .finish()
    }
}

impl Pipeline {
    /// Builds and starts a pipeline of `stage_count` stages.
    ///
    /// `concurrency` and `providers` must both hold exactly `stage_count`
    /// entries. Must be called from within a tokio runtime.
    pub fn new(
        stage_count: usize,
        concurrency: &[usize],
        providers: Vec<Box<dyn TaskProvider>>,
    ) -> Result<Self> {
        if stage_count == 0 {
            return Err(PipelineError::InvalidStageCount);
        }
        if concurrency.len() != stage_count {
            return Err(PipelineError::ConcurrencyMismatch {
                expected: stage_count,
                actual: concurrency.len(),
            });
        }
        Self::with_config(PipelineConfig::new(concurrency), providers)
    }

    pub fn with_config(
        config: PipelineConfig,
        providers: Vec<Box<dyn TaskProvider>>,
    ) -> Result<Self> {
        Self::start(config, providers, CancellationToken::new())
    }

    /// Like [`Pipeline::with_config`], but the pipeline also shuts down when
    /// `parent` is cancelled. Closing the pipeline leaves `parent` untouched.
    pub fn with_config_and_cancel(
        config: PipelineConfig,
        providers: Vec<Box<dyn TaskProvider>>,
        parent: &CancellationToken,
    ) -> Result<Self> {
        Self::start(config, providers, parent.child_token())
    }

    /// Starts a typed pipeline whose first stage consumes `I`.
    pub fn builder<I: Send + 'static>() -> PipelineBuilder<I, I> {
        PipelineBuilder::new()
    }

    fn start(
        config: PipelineConfig,
        providers: Vec<Box<dyn TaskProvider>>,
        shutdown: CancellationToken,
    ) -> Result<Self> {
        config.validate(providers.len())?;
        let runtime = Handle::try_current().map_err(|_| PipelineError::NoRuntime)?;

        let suppressed = Arc::new(AtomicBool::new(config.suppress_output));
        let (output_tx, output_rx) = mpsc::channel(config.output_buffer);

        // Built back to front so each stage loop knows its successor.
        let mut downstream = Downstream::Sink(Sink::new(output_tx, Arc::clone(&suppressed)));
        let mut stages = Vec::with_capacity(config.stage_count());
        let wiring = config.concurrency.iter().zip(providers).enumerate().rev();
        for (index, (&limit, provider)) in wiring {
            let (queue, admitted) = mpsc::channel(limit);
            let stage = Arc::new(Stage::new(index, queue, provider.task()));
            runtime.spawn(StageLoop::new(index, admitted, downstream, shutdown.clone()).run());
            downstream = Downstream::Next(Arc::clone(&stage));
            stages.push(stage);
        }
        stages.reverse();

        debug!(stages = stages.len(), concurrency = ?config.concurrency, "pipeline started");

        Ok(Pipeline {
            stages,
            outputs: (!config.suppress_output).then_some(output_rx),
            concurrency: config.concurrency,
            suppressed,
            shutdown,
            next_job: AtomicU64::new(0),
        })
    }

    /// Pushes a value into the first stage.
    ///
    /// Waits while the first stage is full. After [`Pipeline::close`] the
    /// value is dropped. Values that already are a [`Value`] go through
    /// [`Pipeline::push_value`] instead, to avoid boxing them twice.
    pub async fn push<T: Any + Send>(&self, input: T) {
        self.push_value(Box::new(input)).await
    }

    pub async fn push_value(&self, input: Value) {
        let id = self.next_job.fetch_add(1, Ordering::Relaxed);
        Job::new(id, input).submit(&self.stages[0], &self.shutdown).await;
    }

    /// Discards every final output instead of delivering it. The result queue
    /// is no longer available afterwards.
    pub fn suppress_output(mut self) -> Self {
        self.suppressed.store(true, Ordering::Release);
        self.outputs = None;
        self
    }

    /// Takes the read side of the result queue.
    ///
    /// Returns `None` when output is suppressed or the queue was already
    /// taken. The queue must be drained, otherwise the last stage and then
    /// every stage before it eventually stop admitting jobs. Dropping the
    /// receiver discards later outputs.
    pub fn take_outputs(&mut self) -> Option<mpsc::Receiver<Value>> {
        self.outputs.take()
    }

    /// Triggers shutdown. Does not wait for running tasks; calling it again
    /// has no effect.
    pub fn close(&self) {
        if !self.shutdown.is_cancelled() {
            info!(stages = self.stages.len(), "closing pipeline");
        }
        self.shutdown.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Completes once the pipeline has been closed.
    pub async fn closed(&self) {
        self.shutdown.cancelled().await
    }

    /// A token that is cancelled when the pipeline shuts down. Cancelling it
    /// does not close the pipeline.
    pub fn cancel_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }

    /// Returns the number of stages
    #[inline]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Returns the concurrency limit of each stage
    #[inline]
    pub fn concurrency(&self) -> &[usize] {
        &self.concurrency
    }

    /// Returns whether final outputs are discarded
    #[inline]
    pub fn is_output_suppressed(&self) -> bool {
        self.suppressed.load(Ordering::Acquire)
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
