// Attribution over replayed workloads
//
// Builds small traces with a known shape, replays them, and checks that the
// category summary and hotspots point at the right cost.

use super::*;
use crate::category::{BlockReason, TimeCategory};
use crate::replay::{replay, EventKind, TraceEvent};

/// Task that runs `exec` ns, then blocks for `blocked` ns with `reason`,
/// then runs again until the end
fn task_trace(task: u64, worker: u32, base: u64, exec: u64, reason: BlockReason, blocked: u64) -> Vec<TraceEvent> {
    let unblock = base + exec + blocked;
    vec![
        TraceEvent::local(worker, base, EventKind::Create { task }),
        TraceEvent::local(worker, base, EventKind::Start { task }),
        TraceEvent::local(worker, base + exec, EventKind::Block { reason }),
        TraceEvent::local(worker, unblock, EventKind::Unblock { task }),
        TraceEvent::local(worker, unblock, EventKind::Start { task }),
        TraceEvent::local(worker, unblock + exec, EventKind::End),
    ]
}

/// Network-heavy tasks: waiting dominates and is an expected cost
#[test]
fn test_network_bound_workload() {
    let mut events = Vec::new();
    for task in 0..4 {
        events.extend(task_trace(task, task as u32, 0, 1_000_000, BlockReason::Net, 20_000_000));
    }

    let report = replay(&events);
    let attributions = calculate_time_attribution(report.records.values());

    assert_eq!(attributions[0].category, TimeCategory::NetWait);
    assert_eq!(attributions[0].task_count, 4);
    assert!(attributions[0].percentage > 85.0);

    let hotspots = identify_hotspots(&attributions);
    let net = hotspots
        .iter()
        .find(|h| h.category == TimeCategory::NetWait)
        .unwrap();
    assert!(net.is_expected);
    assert!(net.explanation.contains("I/O bound"));
}

/// Channel hand-offs that block longer than they run are flagged
#[test]
fn test_lock_contention_flagged() {
    let mut events = Vec::new();
    for task in 0..3 {
        events.extend(task_trace(task, 0, task * 100, 10, BlockReason::Recv, 80));
    }
    events.sort_by_key(|e| e.ts);

    let report = replay(&events);
    let hotspots = identify_hotspots(&calculate_time_attribution(report.records.values()));

    let sync = hotspots
        .iter()
        .find(|h| h.category == TimeCategory::SyncBlock)
        .unwrap();
    assert!(!sync.is_expected);
    assert!(sync.to_report_string().starts_with("⚠️ sync_block"));
}

/// Collection overlap appears as its own hotspot
#[test]
fn test_collection_pause_hotspot() {
    let mut events = task_trace(1, 0, 0, 100, BlockReason::Syscall, 100);
    events.push(TraceEvent::global(50, EventKind::GcStart));
    events.push(TraceEvent::global(150, EventKind::GcDone));
    events.sort_by_key(|e| e.ts);

    let report = replay(&events);
    let attributions = calculate_time_attribution(report.records.values());
    let gc = attributions
        .iter()
        .find(|a| a.category == TimeCategory::GcBlock)
        .unwrap();
    assert_eq!(gc.total_time.as_nanos(), 100);

    let hotspots = identify_hotspots(&attributions);
    assert!(hotspots
        .iter()
        .any(|h| h.category == TimeCategory::GcBlock && !h.is_expected));
}

/// Percentages over all categories add up to 100
#[test]
fn test_percentages_sum_to_hundred() {
    let mut events = Vec::new();
    events.extend(task_trace(1, 0, 0, 300, BlockReason::Net, 700));
    events.extend(task_trace(2, 1, 0, 500, BlockReason::Syscall, 200));
    events.sort_by_key(|e| e.ts);

    let report = replay(&events);
    let attributions = calculate_time_attribution(report.records.values());
    let sum: f64 = attributions.iter().map(|a| a.percentage).sum();
    assert!((sum - 100.0).abs() < 1e-6);
}
