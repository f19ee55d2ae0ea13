//! # parallel-pipeline
//!
//! A multi-stage concurrent task pipeline built on Tokio.
//!
//! ## Features
//!
//! - **Per-stage bounded admission** via bounded channels, with backpressure
//!   flowing upstream to the caller
//! - **Concurrent execution, ordered hand-off**: tasks of one stage run in
//!   parallel, jobs leave the stage in admission order
//! - **Cooperative shutdown** through a single cancellation broadcast
//! - **Typed stages** checked at compile time, or opaque stages wired by hand
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use parallel_pipeline::Pipeline;
//!
//! let mut pipeline = Pipeline::builder::<String>()
//!     .sync_stage(3, |s: String| (format!("{} processed", s), true))
//!     .sync_stage(2, |s: String| (format!("{} processed", s), true))
//!     .build()?;
//!
//! let mut outputs = pipeline.take_outputs().unwrap();
//! pipeline.push("job1".to_string()).await;
//! assert_eq!(outputs.recv().await.unwrap(), "job1 processed processed");
//! pipeline.close();
//! ```
//!
//! ## Modules
//!
//! - [`pipeline`] - Stages, jobs, the pipeline controller and its typed builder

pub mod pipeline;

pub use pipeline::{
    FnTask, Outcome, Pipeline, PipelineBuilder, PipelineConfig, PipelineConfigBuilder,
    PipelineError, Result, SyncFnTask, Task, TaskProvider, TypedOutputs, TypedPipeline, Value,
    sync_task_fn, task_fn,
};
