// src/pipeline/builder.rs

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::config::PipelineConfigBuilder;
use super::pipeline::Pipeline;
use super::task::{Task, TaskProvider, Value, downcast, sync_task_fn, task_fn};
use super::types::Result;

/// Assembles a pipeline whose stage types are checked at compile time.
///
/// `I` is the type pushed into the first stage, `O` the output type of the
/// last stage added so far. Each call to [`stage`](Self::stage) takes a
/// function consuming `O`, so adjacent stages cannot disagree on types.
///
/// ```rust,ignore
/// let mut pipeline = Pipeline::builder::<String>()
///     .stage(3, |s: String| async move { (s.len(), true) })
///     .sync_stage(2, |n: usize| (n * 2, n > 0))
///     .build()?;
/// ```
pub struct PipelineBuilder<I, O> {
    tasks: Vec<Arc<dyn Task>>,
    concurrency: Vec<usize>,
    output_buffer: usize,
    suppress_output: bool,
    parent: Option<CancellationToken>,
    _types: PhantomData<fn(I) -> O>,
}

impl<I: Send + 'static> PipelineBuilder<I, I> {
    pub fn new() -> Self {
        PipelineBuilder {
            tasks: Vec::new(),
            concurrency: Vec::new(),
            output_buffer: 1,
            suppress_output: false,
            parent: None,
            _types: PhantomData,
        }
    }
}

impl<I: Send + 'static> Default for PipelineBuilder<I, I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I, O> PipelineBuilder<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    /// Appends an async stage admitting at most `concurrency` jobs.
    pub fn stage<O2, F, Fut>(self, concurrency: usize, f: F) -> PipelineBuilder<I, O2>
    where
        O2: Send + 'static,
        F: Fn(O) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = (O2, bool)> + Send + 'static,
    {
        self.push_task(concurrency, task_fn::<O, O2, F, Fut>(f).task())
    }

    /// Appends a synchronous stage admitting at most `concurrency` jobs.
    pub fn sync_stage<O2, F>(self, concurrency: usize, f: F) -> PipelineBuilder<I, O2>
    where
        O2: Send + 'static,
        F: Fn(O) -> (O2, bool) + Send + Sync + 'static,
    {
        self.push_task(concurrency, sync_task_fn::<O, O2, F>(f).task())
    }

    fn push_task<O2>(mut self, concurrency: usize, task: Arc<dyn Task>) -> PipelineBuilder<I, O2> {
        self.tasks.push(task);
        self.concurrency.push(concurrency);
        PipelineBuilder {
            tasks: self.tasks,
            concurrency: self.concurrency,
            output_buffer: self.output_buffer,
            suppress_output: self.suppress_output,
            parent: self.parent,
            _types: PhantomData,
        }
    }

    pub fn output_buffer(mut self, capacity: usize) -> Self {
        self.output_buffer = capacity;
        self
    }

    pub fn suppress_output(mut self) -> Self {
        self.suppress_output = true;
        self
    }

    /// Shuts the pipeline down when `parent` is cancelled.
    pub fn cancel_token(mut self, parent: CancellationToken) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Validates the stages and starts the pipeline. Must be called from
    /// within a tokio runtime.
    pub fn build(self) -> Result<TypedPipeline<I, O>> {
        let config = PipelineConfigBuilder::default()
            .concurrency(self.concurrency)
            .output_buffer(self.output_buffer)
            .suppress_output(self.suppress_output)
            .build()?;
        let providers: Vec<Box<dyn TaskProvider>> = self
            .tasks
            .into_iter()
            .map(|task| Box::new(task) as Box<dyn TaskProvider>)
            .collect();

        let inner = match &self.parent {
            Some(parent) => Pipeline::with_config_and_cancel(config, providers, parent)?,
            None => Pipeline::with_config(config, providers)?,
        };
        Ok(TypedPipeline {
            inner,
            _types: PhantomData,
        })
    }
}

/// A running pipeline taking `I` and producing `O`.
#[derive(Debug)]
pub struct TypedPipeline<I, O> {
    inner: Pipeline,
    _types: PhantomData<fn(I) -> O>,
}

impl<I, O> TypedPipeline<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    pub async fn push(&self, input: I) {
        self.inner.push(input).await
    }

    /// Takes the result queue; see [`Pipeline::take_outputs`].
    pub fn take_outputs(&mut self) -> Option<TypedOutputs<O>> {
        self.inner.take_outputs().map(|rx| TypedOutputs {
            rx,
            _type: PhantomData,
        })
    }

    pub fn close(&self) {
        self.inner.close()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    pub async fn closed(&self) {
        self.inner.closed().await
    }

    pub fn stage_count(&self) -> usize {
        self.inner.stage_count()
    }

    /// The untyped pipeline underneath.
    pub fn as_untyped(&self) -> &Pipeline {
        &self.inner
    }
}

/// Read side of a typed pipeline's result queue.
#[derive(Debug)]
pub struct TypedOutputs<O> {
    rx: mpsc::Receiver<Value>,
    _type: PhantomData<fn() -> O>,
}

impl<O: Send + 'static> TypedOutputs<O> {
    /// Next final output, or `None` once the pipeline has shut down.
    pub async fn recv(&mut self) -> Option<O> {
        let value = self.rx.recv().await?;
        Some(downcast(value))
    }
}
