use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use parallel_pipeline::Pipeline;
use std::sync::Arc;

const JOBS: u64 = 1000;

async fn run_pipeline(stages: usize, concurrency: usize) {
    let mut builder = Pipeline::builder::<u64>().sync_stage(concurrency, |n: u64| (n + 1, true));
    for _ in 1..stages {
        builder = builder.sync_stage(concurrency, |n: u64| (n + 1, true));
    }
    let mut pipeline = builder.build().unwrap();
    let mut outputs = pipeline.take_outputs().unwrap();
    let pipeline = Arc::new(pipeline);

    let producer = Arc::clone(&pipeline);
    tokio::spawn(async move {
        for n in 0..JOBS {
            producer.push(n).await;
        }
    });

    for _ in 0..JOBS {
        outputs.recv().await.unwrap();
    }
    pipeline.close();
}

// Throughput against the number of stages
fn bench_stage_counts(c: &mut Criterion) {
    let mut group = c.benchmark_group("stage_counts");
    let runtime = tokio::runtime::Runtime::new().unwrap();
    group.throughput(Throughput::Elements(JOBS));

    for stages in [1, 2, 4, 8] {
        group.bench_with_input(BenchmarkId::new("stages", stages), &stages, |b, &stages| {
            b.to_async(&runtime).iter(|| run_pipeline(stages, 4));
        });
    }

    group.finish();
}

// Throughput against the per-stage concurrency limit
fn bench_concurrency_limits(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrency_limits");
    let runtime = tokio::runtime::Runtime::new().unwrap();
    group.throughput(Throughput::Elements(JOBS));

    for limit in [1, 4, 16, 64] {
        group.bench_with_input(BenchmarkId::new("limit", limit), &limit, |b, &limit| {
            b.to_async(&runtime).iter(|| run_pipeline(3, limit));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_stage_counts, bench_concurrency_limits);
criterion_main!(benches);
