use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use pmcheck_core::trace::TraceEvent;
use pmcheck_core::{Checker, CheckerConfig, Region, ThreadId, TxId};

const STORE_SIZE: u64 = 0x40;

/// Build a trace of `n_tx` transactions, each storing `stores_per_tx`
/// cache lines and flushing each one before a fence.
fn build_trace(n_tx: u64, stores_per_tx: u64) -> Vec<TraceEvent> {
    let mut events = vec![TraceEvent::Map {
        addr: 0,
        size: n_tx * stores_per_tx * STORE_SIZE,
    }];
    for tx in 0..n_tx {
        let base = tx * stores_per_tx * STORE_SIZE;
        events.push(TraceEvent::TxBegin {
            tx: TxId(tx),
            thread: ThreadId(1),
        });
        events.push(TraceEvent::TxAdd {
            tx: TxId(tx),
            addr: base,
            size: stores_per_tx * STORE_SIZE,
        });
        for i in 0..stores_per_tx {
            let addr = base + i * STORE_SIZE;
            events.push(TraceEvent::Store {
                thread: ThreadId(1),
                addr,
                size: STORE_SIZE,
                value: i,
                context: None,
            });
            events.push(TraceEvent::Flush {
                addr,
                size: STORE_SIZE,
            });
        }
        events.push(TraceEvent::Fence);
        events.push(TraceEvent::TxEnd { tx: TxId(tx) });
    }
    events
}

fn replay(events: &[TraceEvent], config: CheckerConfig) -> Checker {
    let mut checker = Checker::new(config);
    let _ = checker.apply_all(events);
    checker
}

fn bench_replay(c: &mut Criterion) {
    // Small: 16 transactions of 16 stores
    let trace_small = build_trace(16, 16);

    // Large: 128 transactions of 64 stores
    let trace_large = build_trace(128, 64);

    for trace in [&trace_small, &trace_large] {
        assert!(
            replay(trace, CheckerConfig::default()).finish().summary.total() == 0,
            "benchmark trace generation must produce consistent traces",
        );
    }

    let mut group = c.benchmark_group("replay");

    group.bench_function("full_small", |b| {
        b.iter(|| replay(black_box(&trace_small), CheckerConfig::default()));
    });

    group.bench_function("full_large", |b| {
        b.iter(|| replay(black_box(&trace_large), CheckerConfig::default()));
    });

    group.bench_function("transactions_only_large", |b| {
        b.iter(|| {
            replay(
                black_box(&trace_large),
                CheckerConfig::builder().transactions_only(true).build(),
            )
        });
    });

    group.finish();
}

fn bench_range_state(c: &mut Criterion) {
    // dirty records without fences, so slabs have something to summarize
    let mut checker = Checker::default();
    checker.register_pmem_mapping(Region::new(0, 1 << 24).unwrap());
    for i in 0..4096 {
        let region = Region::new(i * STORE_SIZE * 2, STORE_SIZE).unwrap();
        checker.store(region, i, ThreadId(1), None);
        if i % 3 == 0 {
            checker.flush(region);
        }
    }
    let wide = Region::new(0x1_0000, 0x8_0000).unwrap();
    let narrow = Region::new(0x4_0020, 0x10).unwrap();

    let mut group = c.benchmark_group("range_state");

    group.bench_function("wide", |b| {
        b.iter(|| checker.range_state(black_box(&wide)));
    });

    group.bench_function("narrow", |b| {
        b.iter(|| checker.range_state(black_box(&narrow)));
    });

    group.bench_function("is_durable", |b| {
        b.iter(|| checker.is_durable(black_box(0x4_0020)));
    });

    group.finish();
}

criterion_group!(benches, bench_replay, bench_range_state);
criterion_main!(benches);
