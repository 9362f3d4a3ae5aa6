//! Benchmarks for the span lifecycle utilities over a no-op tracer.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use spanline::message::{Message, Part};
use spanline::tracing::span::NoopTracer;
use spanline::tracing::{finish_spans, init_spans, iterate_with_span};

fn bench_lifecycle(c: &mut Criterion) {
    let msg: Message = (0..64).map(|i| Part::new(format!("part-{i}"))).collect();

    c.bench_function("init_spans_64_parts", |b| {
        b.iter(|| {
            let traced = init_spans(&NoopTracer, "bench", black_box(msg.clone()));
            black_box(traced)
        })
    });

    c.bench_function("iterate_with_span_64_parts", |b| {
        b.iter(|| {
            iterate_with_span(&NoopTracer, "bench", black_box(&msg), |_i, _span, _part| {
                Ok::<(), ()>(())
            })
        })
    });

    c.bench_function("init_then_finish_64_parts", |b| {
        b.iter(|| {
            let traced = init_spans(&NoopTracer, "bench", black_box(msg.clone()));
            finish_spans(&traced);
        })
    });
}

criterion_group!(benches, bench_lifecycle);
criterion_main!(benches);
