// src/pipeline/stage.rs

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace};

use super::job::{Job, Pending};
use super::task::{Task, Value};

/// Admission side of a stage: its bounded queue and the task it runs.
pub(crate) struct Stage {
    index: usize,
    queue: mpsc::Sender<Pending>,
    task: Arc<dyn Task>,
}

impl Stage {
    pub(crate) fn new(index: usize, queue: mpsc::Sender<Pending>, task: Arc<dyn Task>) -> Self {
        Stage { index, queue, task }
    }

    #[inline]
    pub(crate) fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub(crate) fn task(&self) -> Arc<dyn Task> {
        Arc::clone(&self.task)
    }

    /// Waits for room in the admission queue. `false` if the dispatch loop
    /// has stopped.
    pub(crate) async fn admit(&self, pending: Pending) -> bool {
        self.queue.send(pending).await.is_ok()
    }
}

/// Where a stage hands its completed jobs.
pub(crate) enum Downstream {
    Next(Arc<Stage>),
    Sink(Sink),
}

/// Result-delivery end of the last stage.
pub(crate) struct Sink {
    outputs: mpsc::Sender<Value>,
    suppressed: Arc<AtomicBool>,
}

impl Sink {
    pub(crate) fn new(outputs: mpsc::Sender<Value>, suppressed: Arc<AtomicBool>) -> Self {
        Sink {
            outputs,
            suppressed,
        }
    }

    async fn deliver(&self, stage: usize, job: u64, output: Value, shutdown: &CancellationToken) {
        if self.suppressed.load(Ordering::Acquire) {
            trace!(stage, job, "output suppressed");
            return;
        }
        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {}

            sent = self.outputs.send(output) => match sent {
                Ok(()) => trace!(stage, job, "output delivered"),
                Err(_) => trace!(stage, job, "result queue dropped, output discarded"),
            }
        }
    }
}

/// The single dispatch loop of a stage.
///
/// Jobs leave the stage strictly in admission order: a job that finishes
/// early waits behind every job admitted before it.
pub(crate) struct StageLoop {
    index: usize,
    admitted: mpsc::Receiver<Pending>,
    downstream: Downstream,
    shutdown: CancellationToken,
}

impl StageLoop {
    pub(crate) fn new(
        index: usize,
        admitted: mpsc::Receiver<Pending>,
        downstream: Downstream,
        shutdown: CancellationToken,
    ) -> Self {
        StageLoop {
            index,
            admitted,
            downstream,
            shutdown,
        }
    }

    pub(crate) async fn run(mut self) {
        debug!(stage = self.index, "stage loop started");

        loop {
            let pending = tokio::select! {
                biased;

                _ = self.shutdown.cancelled() => break,

                pending = self.admitted.recv() => match pending {
                    Some(pending) => pending,
                    None => break,
                },
            };

            let id = pending.id;
            let outcome = tokio::select! {
                biased;

                _ = self.shutdown.cancelled() => break,

                finished = pending.finished => match finished {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        // Only a panicking task abandons its signal without shutdown.
                        error!(
                            stage = self.index,
                            job = id,
                            "task panicked (mismatched stage types or a task bug), \
                             shutting down pipeline"
                        );
                        self.shutdown.cancel();
                        break;
                    }
                },
            };

            if !outcome.proceed {
                trace!(stage = self.index, job = id, "job rejected, dropped");
                continue;
            }

            match &self.downstream {
                Downstream::Next(next) => {
                    trace!(stage = self.index, job = id, next = next.index(), "forwarding job");
                    Job::forward(id, outcome).submit(next, &self.shutdown).await;
                }
                Downstream::Sink(sink) => {
                    sink.deliver(self.index, id, outcome.output, &self.shutdown).await;
                }
            }
        }

        debug!(stage = self.index, "stage loop stopped");
    }
}
