//! Live accumulator transition cost
//!
//! Every scheduler hook closes one edge, opens the next and publishes a new
//! state. These benchmarks measure that hot path with a manual clock so the
//! clock read does not dominate.
//!
//! # Run Instructions
//!
//! ```bash
//! cargo bench --bench live_transitions
//! ```

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;
use taskclock::category::BlockReason;
use taskclock::clock::{Clock, ManualClock, MonotonicClock};
use taskclock::live::LiveAccumulator;

fn bench_block_unblock_cycle(c: &mut Criterion) {
    let clock = Arc::new(ManualClock::new(0));
    let mut task = LiveAccumulator::new(1, clock.clone());
    task.on_create().unwrap();

    c.bench_function("live_start_block_unblock", |b| {
        b.iter(|| {
            clock.advance(10);
            task.on_start().unwrap();
            clock.advance(10);
            task.on_block(black_box(BlockReason::Recv)).unwrap();
            clock.advance(10);
            task.on_unblock().unwrap();
        });
    });
}

fn bench_syscall_pair(c: &mut Criterion) {
    let clock = Arc::new(ManualClock::new(0));
    let mut task = LiveAccumulator::new(1, clock.clone());
    task.on_create().unwrap();
    task.on_start().unwrap();

    c.bench_function("live_syscall_pair", |b| {
        b.iter(|| {
            clock.advance(5);
            task.on_syscall_enter().unwrap();
            clock.advance(5);
            task.on_syscall_exit().unwrap();
            task.on_start().unwrap();
        });
    });
}

fn bench_snapshot(c: &mut Criterion) {
    let clock = Arc::new(ManualClock::new(0));
    let mut task = LiveAccumulator::new(1, clock.clone());
    task.on_create().unwrap();
    task.on_start().unwrap();
    task.on_sweep_start();
    let handle = task.handle();

    c.bench_function("live_handle_snapshot", |b| {
        b.iter(|| black_box(handle.snapshot()));
    });
}

fn bench_monotonic_clock(c: &mut Criterion) {
    let clock = MonotonicClock::new();
    c.bench_function("monotonic_now_nanos", |b| {
        b.iter(|| black_box(clock.now_nanos()));
    });
}

criterion_group!(
    benches,
    bench_block_unblock_cycle,
    bench_syscall_pair,
    bench_snapshot,
    bench_monotonic_clock
);
criterion_main!(benches);
