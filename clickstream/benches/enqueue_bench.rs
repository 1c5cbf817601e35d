//! Benchmarks for enqueue acceptance latency.

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use std::sync::Arc;

use clickstream::core::EventRecord;
use clickstream::events::NoOpEventSink;
use clickstream::queue::{EventQueue, QueueConfig};

fn enqueue_benchmark(c: &mut Criterion) {
    c.bench_function("enqueue_click", |b| {
        b.iter_batched(
            || EventQueue::new(Arc::new(NoOpEventSink), QueueConfig::new().unbounded()),
            |queue| {
                let handle =
                    queue.enqueue(black_box(EventRecord::click("BUTTON#buy", 10.0, 20.0)));
                black_box((handle, queue))
            },
            BatchSize::SmallInput,
        );
    });

    c.bench_function("enqueue_into_backlog_1000", |b| {
        b.iter_batched(
            || {
                let queue =
                    EventQueue::new(Arc::new(NoOpEventSink), QueueConfig::new().unbounded());
                let handles: Vec<_> = (0..1000)
                    .filter_map(|_| queue.enqueue(EventRecord::scroll(100.0)).ok())
                    .collect();
                (queue, handles)
            },
            |(queue, handles)| {
                let handle = queue.enqueue(black_box(EventRecord::scroll(450.0)));
                black_box((handle, handles))
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, enqueue_benchmark);
criterion_main!(benches);
