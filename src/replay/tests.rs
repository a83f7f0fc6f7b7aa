// Trace replay tests

use super::*;
use crate::category::BlockReason;
use crate::error::ReplayError;

fn block(reason: BlockReason) -> EventKind {
    EventKind::Block { reason }
}

fn apply_all(acc: &mut ReplayAccumulator, events: &[TraceEvent]) {
    for event in events {
        acc.apply(event).unwrap();
    }
}

#[test]
fn test_channel_block_lifecycle() {
    let events = [
        TraceEvent::local(0, 0, EventKind::Create { task: 1 }),
        TraceEvent::local(0, 5, EventKind::Start { task: 1 }),
        TraceEvent::local(0, 100, block(BlockReason::Sync)),
        TraceEvent::local(1, 150, EventKind::Unblock { task: 1 }),
        TraceEvent::local(0, 160, EventKind::Start { task: 1 }),
        TraceEvent::local(0, 500, EventKind::End),
    ];

    let report = replay(&events);
    let record = report.get(1).unwrap();
    assert_eq!(record.sched_wait, 15);
    assert_eq!(record.executing, 435);
    assert_eq!(record.sync_block, 50);
    assert_eq!(record.total, 500);
    assert_eq!(record.end_time, Some(500));
    assert_eq!(report.dropped, 0);
    assert_eq!(report.events_applied, 6);
}

#[test]
fn test_task_created_inside_collection() {
    let events = [
        TraceEvent::global(0, EventKind::GcStart),
        TraceEvent::local(0, 10, EventKind::Create { task: 1 }),
        TraceEvent::local(0, 10, EventKind::Start { task: 1 }),
        TraceEvent::local(0, 1000, EventKind::End),
        TraceEvent::global(1000, EventKind::GcDone),
    ];

    let report = replay(&events);
    let record = report.get(1).unwrap();
    assert_eq!(record.gc_block, 990);
    assert_eq!(record.total, 990);
    assert_eq!(report.dropped, 0);
}

#[test]
fn test_unblock_resolves_task_on_other_worker() {
    let events = [
        TraceEvent::local(0, 0, EventKind::Create { task: 1 }),
        TraceEvent::local(0, 0, EventKind::Batch { next: WorkerId::Local(0) }),
        TraceEvent::local(0, 1, EventKind::Start { task: 1 }),
        TraceEvent::local(1, 2, EventKind::Create { task: 2 }),
        TraceEvent::local(1, 3, EventKind::Start { task: 2 }),
        // p0 switches context; task 1 is saved aside
        TraceEvent::local(0, 10, EventKind::Batch { next: WorkerId::Local(7) }),
        TraceEvent::local(0, 10, EventKind::Create { task: 3 }),
        TraceEvent::local(0, 11, EventKind::Start { task: 3 }),
        TraceEvent::local(0, 20, block(BlockReason::Recv)),
        // Back to the first context: task 1 is current again
        TraceEvent::local(0, 30, EventKind::Batch { next: WorkerId::Local(0) }),
        TraceEvent::local(0, 40, block(BlockReason::Sync)),
        // p1 wakes task 1, whose record lives in p0's collector
        TraceEvent::local(1, 50, EventKind::Unblock { task: 1 }),
    ];

    let mut acc = ReplayAccumulator::new();
    apply_all(&mut acc, &events);

    let one = acc.snapshot(1).unwrap();
    assert_eq!(one.executing, 39);
    assert_eq!(one.sync_block, 10);
    assert_eq!(acc.demux().locate(WorkerId::Local(1), 1), Some(WorkerId::Local(0)));

    let three = acc.snapshot(3).unwrap();
    assert_eq!(three.executing, 9);
    assert_eq!(three.sync_block, 30);

    // Task 2 keeps running on p1 untouched
    let two = acc.snapshot(2).unwrap();
    assert_eq!(two.sched_wait, 1);
    assert_eq!(two.executing, 47);
    assert_eq!(two.sync_block, 0);
}

#[test]
fn test_unknown_task_is_dropped_without_side_effects() {
    let clean = [
        TraceEvent::local(0, 0, EventKind::Create { task: 1 }),
        TraceEvent::local(0, 5, EventKind::Start { task: 1 }),
        TraceEvent::local(0, 50, block(BlockReason::Net)),
        TraceEvent::local(0, 80, EventKind::Unblock { task: 1 }),
        TraceEvent::local(0, 100, EventKind::Start { task: 1 }),
        TraceEvent::local(0, 120, EventKind::End),
    ];
    let mut noisy = clean.to_vec();
    noisy.insert(3, TraceEvent::local(0, 60, EventKind::Unblock { task: 99 }));

    let mut acc = ReplayAccumulator::new();
    apply_all(&mut acc, &noisy[..3]);
    assert_eq!(
        acc.apply(&noisy[3]),
        Err(ReplayError::UnknownTask {
            worker: WorkerId::Local(0),
            task: 99,
            event: "unblock",
        })
    );

    let with_noise = replay(&noisy);
    let without = replay(&clean);
    assert_eq!(with_noise.records, without.records);
    assert_eq!(with_noise.dropped, 1);
    assert!(with_noise.get(99).is_none());
    assert_eq!(with_noise.get(1).unwrap().net_wait, 30);
}

#[test]
fn test_start_of_unknown_task_hides_previous_one() {
    let events = [
        TraceEvent::local(0, 0, EventKind::Create { task: 1 }),
        TraceEvent::local(0, 1, EventKind::Start { task: 1 }),
        TraceEvent::local(0, 5, EventKind::Start { task: 42 }),
        TraceEvent::local(0, 9, EventKind::End),
    ];
    let report = replay(&events);

    // Both the start and the end were about task 42
    assert_eq!(report.dropped, 2);
    let record = report.get(1).unwrap();
    assert_eq!(record.end_time, Some(9));
    assert_eq!(record.executing, 8);
}

#[test]
fn test_event_after_end_rejected() {
    let mut acc = ReplayAccumulator::new();
    apply_all(
        &mut acc,
        &[
            TraceEvent::local(0, 0, EventKind::Create { task: 1 }),
            TraceEvent::local(0, 1, EventKind::Start { task: 1 }),
            TraceEvent::local(0, 2, EventKind::End),
        ],
    );

    assert_eq!(
        acc.apply(&TraceEvent::local(0, 3, EventKind::Unblock { task: 1 })),
        Err(ReplayError::EventAfterEnd {
            task: 1,
            event: "unblock"
        })
    );
    assert_eq!(
        acc.apply(&TraceEvent::local(0, 4, EventKind::Sched)),
        Err(ReplayError::NoActiveTask {
            worker: WorkerId::Local(0),
            event: "sched"
        })
    );
}

#[test]
fn test_duplicate_create_rejected() {
    let mut acc = ReplayAccumulator::new();
    acc.apply(&TraceEvent::local(0, 0, EventKind::Create { task: 1 }))
        .unwrap();
    assert_eq!(
        acc.apply(&TraceEvent::local(2, 5, EventKind::Create { task: 1 })),
        Err(ReplayError::DuplicateTask(1))
    );
    assert_eq!(acc.snapshot(1).unwrap().creation_time, Some(0));
}

#[test]
fn test_gc_done_without_start() {
    let mut acc = ReplayAccumulator::new();
    assert_eq!(
        acc.apply(&TraceEvent::global(7, EventKind::GcDone)),
        Err(ReplayError::GcNotActive { ts: 7 })
    );
    assert_eq!(acc.events_applied(), 0);
    assert_eq!(acc.last_timestamp(), 7);
}

#[test]
fn test_nested_gc_start_keeps_earliest() {
    let mut acc = ReplayAccumulator::new();
    apply_all(
        &mut acc,
        &[
            TraceEvent::local(0, 0, EventKind::Create { task: 1 }),
            TraceEvent::global(10, EventKind::GcStart),
            TraceEvent::global(20, EventKind::GcStart),
        ],
    );
    assert_eq!(acc.active_collection(), Some(10));

    acc.apply(&TraceEvent::global(50, EventKind::GcDone)).unwrap();
    assert_eq!(acc.active_collection(), None);
    assert_eq!(acc.snapshot(1).unwrap().gc_block, 40);
}

#[test]
fn test_gc_done_charges_every_collector() {
    let mut acc = ReplayAccumulator::new();
    apply_all(
        &mut acc,
        &[
            TraceEvent::local(0, 0, EventKind::Create { task: 1 }),
            TraceEvent::local(3, 0, EventKind::Create { task: 2 }),
            TraceEvent::global(0, EventKind::Create { task: 3 }),
            TraceEvent::global(100, EventKind::GcStart),
            TraceEvent::local(3, 120, EventKind::Create { task: 4 }),
            TraceEvent::global(200, EventKind::GcDone),
            TraceEvent::local(0, 300, EventKind::Create { task: 5 }),
        ],
    );

    let records = acc.records();
    assert_eq!(records[&1].gc_block, 100);
    assert_eq!(records[&2].gc_block, 100);
    assert_eq!(records[&3].gc_block, 100);
    // Created mid-collection: only the overlap
    assert_eq!(records[&4].gc_block, 80);
    // Created after the collection
    assert_eq!(records[&5].gc_block, 0);
}

#[test]
fn test_task_ended_before_collection_not_charged() {
    let report = replay(&[
        TraceEvent::local(0, 0, EventKind::Create { task: 1 }),
        TraceEvent::local(0, 1, EventKind::Start { task: 1 }),
        TraceEvent::local(0, 9, EventKind::End),
        TraceEvent::global(10, EventKind::GcStart),
        TraceEvent::global(90, EventKind::GcDone),
    ]);
    assert_eq!(report.get(1).unwrap().gc_block, 0);
}

#[test]
fn test_gc_block_opens_no_edge() {
    let mut acc = ReplayAccumulator::new();
    apply_all(
        &mut acc,
        &[
            TraceEvent::local(0, 0, EventKind::Create { task: 1 }),
            TraceEvent::local(0, 0, EventKind::Start { task: 1 }),
            TraceEvent::local(0, 10, block(BlockReason::Gc)),
            TraceEvent::local(0, 40, EventKind::Unblock { task: 1 }),
        ],
    );

    let snap = acc.snapshot(1).unwrap();
    assert_eq!(snap.executing, 10);
    assert_eq!(snap.gc_block, 0);
    assert_eq!(snap.unattributed(), 30);
}

#[test]
fn test_syscall_exit_on_other_worker() {
    let report = replay(&[
        TraceEvent::local(0, 0, EventKind::Create { task: 1 }),
        TraceEvent::local(0, 2, EventKind::Start { task: 1 }),
        TraceEvent::local(0, 12, EventKind::SyscallEnter),
        TraceEvent::local(2, 62, EventKind::SyscallExit { task: 1 }),
        TraceEvent::local(2, 70, EventKind::Start { task: 1 }),
        TraceEvent::local(2, 75, EventKind::End),
    ]);

    let record = report.get(1).unwrap();
    assert_eq!(record.syscall_block, 50);
    assert_eq!(record.sched_wait, 10);
    assert_eq!(record.executing, 15);
    assert_eq!(record.primary_sum(), record.total);
}

#[test]
fn test_sweep_charges_running_task_only() {
    let report = replay(&[
        // No running task yet: ignored
        TraceEvent::local(0, 0, EventKind::SweepStart),
        TraceEvent::local(0, 0, EventKind::Create { task: 1 }),
        TraceEvent::local(0, 1, EventKind::Start { task: 1 }),
        TraceEvent::local(0, 4, EventKind::SweepStart),
        TraceEvent::local(0, 9, EventKind::SweepDone),
        TraceEvent::local(0, 10, EventKind::Stop),
    ]);

    let record = report.get(1).unwrap();
    assert_eq!(record.sweeping, 5);
    assert_eq!(record.executing, 9);
    assert_eq!(report.dropped, 0);
}

#[test]
fn test_block_stop_finalizes() {
    let report = replay(&[
        TraceEvent::local(0, 0, EventKind::Create { task: 1 }),
        TraceEvent::local(0, 1, EventKind::Start { task: 1 }),
        TraceEvent::local(0, 6, block(BlockReason::Stop)),
        TraceEvent::local(0, 30, EventKind::Create { task: 2 }),
    ]);

    assert_eq!(report.get(1).unwrap().end_time, Some(6));
    assert_eq!(report.last_timestamp, 30);
}

#[test]
fn test_finish_finalizes_open_tasks_at_last_timestamp() {
    let report = replay(&[
        TraceEvent::local(0, 0, EventKind::Create { task: 1 }),
        TraceEvent::local(0, 10, EventKind::Start { task: 1 }),
        TraceEvent::global(20, EventKind::GcStart),
        TraceEvent::local(1, 50, EventKind::Create { task: 2 }),
    ]);

    let one = report.get(1).unwrap();
    assert_eq!(one.end_time, Some(50));
    assert_eq!(one.executing, 40);
    assert_eq!(one.gc_block, 30);
    assert_eq!(one.total, 50);

    let two = report.get(2).unwrap();
    assert_eq!(two.total, 0);
    assert_eq!(two.gc_block, 0);
}

#[test]
fn test_snapshot_is_non_destructive() {
    let mut acc = ReplayAccumulator::new();
    apply_all(
        &mut acc,
        &[
            TraceEvent::local(0, 0, EventKind::Create { task: 1 }),
            TraceEvent::local(0, 10, EventKind::Start { task: 1 }),
        ],
    );

    assert_eq!(acc.snapshot_at(1, 30), acc.snapshot_at(1, 30));
    assert_eq!(acc.snapshot_at(1, 30).unwrap().executing, 20);
    assert_eq!(acc.snapshot(1).unwrap().executing, 0);
    assert!(acc.snapshot(2).is_none());

    acc.apply(&TraceEvent::local(0, 40, EventKind::End)).unwrap();
    assert_eq!(acc.snapshot(1).unwrap().executing, 30);
}

#[test]
fn test_replay_is_deterministic() {
    let mut events = Vec::new();
    for task in 0..20u64 {
        let worker = (task % 4) as u32;
        let base = task * 10;
        events.push(TraceEvent::local(worker, base, EventKind::Create { task }));
        events.push(TraceEvent::local(worker, base + 1, EventKind::Start { task }));
        events.push(TraceEvent::local(worker, base + 4, block(BlockReason::Net)));
    }
    events.push(TraceEvent::global(300, EventKind::GcStart));
    events.push(TraceEvent::global(350, EventKind::GcDone));

    let first = serde_json::to_string(&replay(&events)).unwrap();
    let second = serde_json::to_string(&replay(&events)).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_out_of_range_worker_dropped() {
    let report = replay(&[
        TraceEvent::local(u32::MAX, 0, EventKind::Create { task: 1 }),
        TraceEvent::local(0, 1, EventKind::Create { task: 2 }),
    ]);
    assert_eq!(report.dropped, 1);
    assert_eq!(report.len(), 1);
}
