pub mod builder;
pub mod config;
mod job;
pub mod pipeline;
mod stage;
pub mod task;
pub mod types;

pub use builder::{PipelineBuilder, TypedOutputs, TypedPipeline};
pub use config::{PipelineConfig, PipelineConfigBuilder};
pub use pipeline::Pipeline;
pub use task::{FnTask, Outcome, SyncFnTask, Task, TaskProvider, Value, sync_task_fn, task_fn};
pub use types::{PipelineError, Result};
