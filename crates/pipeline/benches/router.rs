//! Router benchmark suite
//!
//! Run with: `cargo bench -p tlslog-pipeline`

use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use tlslog_pipeline::{MemoryBoundedQueue, Palette, Router, SinkHandle};
use tlslog_protocol::encode_frame;
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;

/// Sink handle whose consumer discards everything
fn draining_sink(rt: &Runtime, name: &str, budget: usize) -> SinkHandle {
    let queue = Arc::new(MemoryBoundedQueue::new(budget));
    let consumer = Arc::clone(&queue);
    let task = rt.spawn(async move { while consumer.pop().await.is_some() {} });
    SinkHandle::new(name, queue, CancellationToken::new(), task)
}

/// File sink only vs file + console
fn bench_route(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let frame = encode_frame("<166>benchmark message with some additional data");

    let mut group = c.benchmark_group("route");
    group.throughput(Throughput::Elements(1));

    for screen in [false, true] {
        let file = draining_sink(&rt, "file", 1024 * 1024);
        let mut router = Router::new(file, Palette::default());
        if screen {
            router = router.with_console(draining_sink(&rt, "console", 1024 * 1024));
        }

        group.bench_with_input(
            BenchmarkId::from_parameter(if screen { "file_console" } else { "file" }),
            &router,
            |b, router| {
                b.to_async(&rt)
                    .iter(|| async { black_box(router.route(frame.as_bytes()).await) })
            },
        );
    }

    group.finish();
}

/// Push/pop through a queue small enough to exercise backpressure
fn bench_queue_backpressure(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("queue_backpressure");

    for budget in [4 * 1024, 64 * 1024, 1024 * 1024] {
        group.throughput(Throughput::Elements(1000));
        group.bench_with_input(BenchmarkId::from_parameter(budget), &budget, |b, &budget| {
            b.to_async(&rt).iter(|| async move {
                let queue = Arc::new(MemoryBoundedQueue::new(budget));
                let consumer = Arc::clone(&queue);
                let task = tokio::spawn(async move {
                    let mut count = 0usize;
                    while consumer.pop().await.is_some() {
                        count += 1;
                    }
                    count
                });

                for i in 0..1000 {
                    let _ = queue.push(format!("<14>record {i}")).await;
                }
                queue.close();
                black_box(task.await)
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_route, bench_queue_backpressure);
criterion_main!(benches);
