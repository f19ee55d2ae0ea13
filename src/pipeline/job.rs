// src/pipeline/job.rs

use std::sync::Arc;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use super::stage::Stage;
use super::task::{Outcome, Task, Value};

/// A unit of work on its way into a stage.
///
/// Owned by exactly one stage at a time. Forwarding rebuilds it from the
/// previous outcome, so every hop gets a fresh completion signal.
pub(crate) struct Job {
    id: u64,
    input: Value,
}

/// The admitted side of a job, waiting in a stage's admission queue.
pub(crate) struct Pending {
    pub(crate) id: u64,
    pub(crate) finished: oneshot::Receiver<Outcome>,
}

impl Job {
    pub(crate) fn new(id: u64, input: Value) -> Self {
        Job { id, input }
    }

    /// Rebuilds the job for the next stage: the previous output becomes the
    /// input.
    pub(crate) fn forward(id: u64, outcome: Outcome) -> Self {
        Job::new(id, outcome.output)
    }

    /// Admits the job into `stage` and starts executing it right away.
    ///
    /// Waits while the stage's queue is full. If shutdown is observed first,
    /// the job is dropped without running.
    pub(crate) async fn submit(self, stage: &Stage, shutdown: &CancellationToken) {
        let id = self.id;
        let (done, finished) = oneshot::channel();

        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                trace!(stage = stage.index(), job = id, "shutdown before admission, job dropped");
            }

            sent = stage.admit(Pending { id, finished }) => {
                if !sent {
                    trace!(stage = stage.index(), job = id, "stage stopped, job dropped");
                    return;
                }
                trace!(stage = stage.index(), job = id, "job admitted");
                tokio::spawn(self.run(stage.task(), done, shutdown.clone()));
            }
        }
    }

    /// Runs the task and reports the outcome, unless shutdown happened in the
    /// meantime.
    async fn run(
        self,
        task: Arc<dyn Task>,
        done: oneshot::Sender<Outcome>,
        shutdown: CancellationToken,
    ) {
        let outcome = task.run(self.input).await;
        if shutdown.is_cancelled() {
            return;
        }
        // The dispatch loop may already be gone.
        let _ = done.send(outcome);
    }
}
