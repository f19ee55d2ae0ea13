//! Three-stage pipeline appending a suffix at every stage.
//!
//! Jobs run concurrently inside each stage but come out in push order.
//!
//! Run with: cargo run --example three_stage

use async_trait::async_trait;
use parallel_pipeline::{Outcome, Pipeline, Task, TaskProvider, Value};
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

/// Appends " processed" after a delay that shrinks with the job number, so
/// later jobs tend to finish first.
struct Processed {
    stage: usize,
}

#[async_trait]
impl Task for Processed {
    async fn run(&self, input: Value) -> Outcome {
        let Ok(input) = input.downcast::<String>() else {
            return Outcome::discard();
        };
        let job_number = input
            .split_whitespace()
            .next()
            .and_then(|job| job.trim_start_matches("job").parse::<u64>().ok())
            .unwrap_or(0);
        let delay = 60u64.saturating_sub(job_number * 10);
        tokio::time::sleep(Duration::from_millis(delay)).await;
        tracing::info!(stage = self.stage, job = %input, "processed");
        Outcome::forward(format!("{} processed", input))
    }
}

struct ProcessedProvider(usize);

impl TaskProvider for ProcessedProvider {
    fn task(&self) -> Arc<dyn Task> {
        Arc::new(Processed { stage: self.0 })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let providers: Vec<Box<dyn TaskProvider>> = (0..3)
        .map(|stage| Box::new(ProcessedProvider(stage)) as Box<dyn TaskProvider>)
        .collect();
    let mut pipeline = Pipeline::new(3, &[3, 2, 3], providers)?;
    let mut outputs = pipeline.take_outputs().ok_or("output is suppressed")?;
    let pipeline = Arc::new(pipeline);

    let producer = Arc::clone(&pipeline);
    tokio::spawn(async move {
        for n in 1..=5 {
            producer.push(format!("job{}", n)).await;
        }
    });

    for _ in 0..5 {
        let Some(output) = outputs.recv().await else {
            break;
        };
        if let Ok(output) = output.downcast::<String>() {
            println!("{}", output);
        }
    }

    pipeline.close();
    Ok(())
}
