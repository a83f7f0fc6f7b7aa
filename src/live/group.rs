// Task groups: tasks sharing one scheduler-tick counter

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A collection of tasks whose scheduler ticks are counted together
///
/// Cloning yields another reference to the same group. Tasks spawned
/// without an explicit group share their registry's default group.
#[derive(Debug, Clone, Default)]
pub struct TaskGroup {
    ticks: Arc<AtomicU64>,
}

impl TaskGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times any task in the group was scheduled
    pub fn sched_ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    pub(crate) fn record_tick(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    /// Whether `self` and `other` are the same group
    pub fn same_group(&self, other: &TaskGroup) -> bool {
        Arc::ptr_eq(&self.ticks, &other.ticks)
    }
}
