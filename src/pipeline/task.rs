// src/pipeline/task.rs

use async_trait::async_trait;
use std::any::{Any, type_name};
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

/// Opaque payload handed from one stage to the next.
pub type Value = Box<dyn Any + Send>;

/// What a [`Task`] produced for one job.
pub struct Outcome {
    pub output: Value,
    /// `false` drops the job: it is neither forwarded nor delivered.
    pub proceed: bool,
}

impl Outcome {
    pub fn new(output: Value, proceed: bool) -> Self {
        Self { output, proceed }
    }

    /// Output that moves on to the next stage (or the result queue).
    pub fn forward<T: Any + Send>(output: T) -> Self {
        Self::new(Box::new(output), true)
    }

    /// Drops the job silently.
    pub fn discard() -> Self {
        Self::new(Box::new(()), false)
    }
}

impl fmt::Debug for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Outcome")
            .field("proceed", &self.proceed)
            .finish_non_exhaustive()
    }
}

/// Per-stage processing function.
///
/// A task may be invoked concurrently for different jobs, up to the stage's
/// concurrency limit, so it must not rely on state shared between calls.
/// Failure is expressed as [`Outcome::proceed`] being `false`; there is no
/// error channel.
#[async_trait]
pub trait Task: Send + Sync {
    async fn run(&self, input: Value) -> Outcome;
}

/// Supplies the task a stage runs. Called once per stage at construction.
pub trait TaskProvider {
    fn task(&self) -> Arc<dyn Task>;
}

impl TaskProvider for Arc<dyn Task> {
    fn task(&self) -> Arc<dyn Task> {
        Arc::clone(self)
    }
}

/// Unboxes a stage input into the type the stage was written for.
///
/// # Panics
///
/// Panics when the value is of another type. That only happens when
/// adjacent stages are wired with mismatched types, which is a programming
/// error rather than a per-job failure.
pub(crate) fn downcast<T: Any>(value: Value) -> T {
    match value.downcast::<T>() {
        Ok(value) => *value,
        Err(_) => panic!(
            "pipeline value is not a `{}`: adjacent stages are wired with mismatched types",
            type_name::<T>()
        ),
    }
}

/// Strongly typed async task: `Fn(I) -> Future<Output = (O, bool)>`.
///
/// Built with [`task_fn`].
pub struct FnTask<I, O, F> {
    f: Arc<F>,
    _types: PhantomData<fn(I) -> O>,
}

impl<I, O, F> Clone for FnTask<I, O, F> {
    fn clone(&self) -> Self {
        Self {
            f: Arc::clone(&self.f),
            _types: PhantomData,
        }
    }
}

/// Wraps an async function so it can drive a stage.
///
/// ```rust
/// use parallel_pipeline::task_fn;
///
/// let shout = task_fn(|s: String| async move { (s.to_uppercase(), true) });
/// # let _ = shout;
/// ```
pub fn task_fn<I, O, F, Fut>(f: F) -> FnTask<I, O, F>
where
    I: Send + 'static,
    O: Send + 'static,
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (O, bool)> + Send + 'static,
{
    FnTask {
        f: Arc::new(f),
        _types: PhantomData,
    }
}

#[async_trait]
impl<I, O, F, Fut> Task for FnTask<I, O, F>
where
    I: Send + 'static,
    O: Send + 'static,
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (O, bool)> + Send + 'static,
{
    async fn run(&self, input: Value) -> Outcome {
        let (output, proceed) = (self.f)(downcast::<I>(input)).await;
        Outcome::new(Box::new(output), proceed)
    }
}

impl<I, O, F, Fut> TaskProvider for FnTask<I, O, F>
where
    I: Send + 'static,
    O: Send + 'static,
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (O, bool)> + Send + 'static,
{
    fn task(&self) -> Arc<dyn Task> {
        Arc::new(self.clone())
    }
}

/// Strongly typed synchronous task: `Fn(I) -> (O, bool)`.
///
/// Built with [`sync_task_fn`]. The function runs on the async worker, so it
/// should return promptly.
pub struct SyncFnTask<I, O, F> {
    f: Arc<F>,
    _types: PhantomData<fn(I) -> O>,
}

impl<I, O, F> Clone for SyncFnTask<I, O, F> {
    fn clone(&self) -> Self {
        Self {
            f: Arc::clone(&self.f),
            _types: PhantomData,
        }
    }
}

pub fn sync_task_fn<I, O, F>(f: F) -> SyncFnTask<I, O, F>
where
    I: Send + 'static,
    O: Send + 'static,
    F: Fn(I) -> (O, bool) + Send + Sync + 'static,
{
    SyncFnTask {
        f: Arc::new(f),
        _types: PhantomData,
    }
}

#[async_trait]
impl<I, O, F> Task for SyncFnTask<I, O, F>
where
    I: Send + 'static,
    O: Send + 'static,
    F: Fn(I) -> (O, bool) + Send + Sync + 'static,
{
    async fn run(&self, input: Value) -> Outcome {
        let (output, proceed) = (self.f)(downcast::<I>(input));
        Outcome::new(Box::new(output), proceed)
    }
}

impl<I, O, F> TaskProvider for SyncFnTask<I, O, F>
where
    I: Send + 'static,
    O: Send + 'static,
    F: Fn(I) -> (O, bool) + Send + Sync + 'static,
{
    fn task(&self) -> Arc<dyn Task> {
        Arc::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Suffix(&'static str);

    #[async_trait]
    impl Task for Suffix {
        async fn run(&self, input: Value) -> Outcome {
            let input: String = downcast(input);
            Outcome::forward(format!("{} {}", input, self.0))
        }
    }

    #[tokio::test]
    async fn test_async_task_fn_runs_typed_function() {
        let task = task_fn(|n: i32| async move { (n * 2, n > 0) });

        let outcome = task.run(Box::new(21)).await;
        assert!(outcome.proceed);
        assert_eq!(downcast::<i32>(outcome.output), 42);

        let outcome = task.run(Box::new(-1)).await;
        assert!(!outcome.proceed);
    }

    #[tokio::test]
    async fn test_sync_task_fn_runs_typed_function() {
        let task = sync_task_fn(|s: String| (s.len(), true));

        let outcome = task.run(Box::new("four".to_string())).await;
        assert!(outcome.proceed);
        assert_eq!(downcast::<usize>(outcome.output), 4);
    }

    #[tokio::test]
    async fn test_provider_shares_the_wrapped_function() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let provider = sync_task_fn(move |n: u8| {
            counter.fetch_add(1, Ordering::SeqCst);
            (n, true)
        });

        let first = provider.task();
        let second = provider.task();
        first.run(Box::new(1u8)).await;
        second.run(Box::new(2u8)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_arc_task_is_its_own_provider() {
        let task: Arc<dyn Task> = Arc::new(Suffix("processed"));
        let outcome = task.task().run(Box::new("job1".to_string())).await;

        assert_eq!(downcast::<String>(outcome.output), "job1 processed");
    }

    #[tokio::test]
    #[should_panic(expected = "mismatched types")]
    async fn test_mismatched_input_type_panics() {
        let task = task_fn(|n: i32| async move { (n, true) });
        task.run(Box::new("not a number")).await;
    }

    #[test]
    fn test_discard_does_not_proceed() {
        let outcome = Outcome::discard();
        assert!(!outcome.proceed);
        assert!(format!("{:?}", outcome).contains("proceed: false"));
    }
}
