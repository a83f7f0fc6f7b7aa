// Open time intervals and the finalize arithmetic
//
// An edge is an interval that has started but not yet been charged to a
// bucket. Primary edges are mutually exclusive: opening one closes every
// other. The sweep edge is independent and may overlap a primary edge.

use super::record::{TaskTimeRecord, TimeCategory};

/// Order in which open edges are closed on settle/finalize
pub const SETTLE_ORDER: [TimeCategory; 7] = [
    TimeCategory::Executing,
    TimeCategory::SyncBlock,
    TimeCategory::NetWait,
    TimeCategory::SyscallBlock,
    TimeCategory::GcBlock,
    TimeCategory::SchedWait,
    TimeCategory::Sweeping,
];

/// Portion of a collection pause starting at `gc_start` that a task created
/// at `creation` has lived through by `at`
///
/// A task created mid-pause is only charged from its creation onwards.
pub fn collection_overlap(gc_start: u64, creation: Option<u64>, at: u64) -> u64 {
    let from = creation.map_or(gc_start, |created| created.max(gc_start));
    at.saturating_sub(from)
}

/// Currently open interval per category, keyed by its start timestamp
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingEdges {
    executing: Option<u64>,
    sched_wait: Option<u64>,
    sync_block: Option<u64>,
    net_wait: Option<u64>,
    syscall_block: Option<u64>,
    gc_block: Option<u64>,
    sweeping: Option<u64>,
}

impl PendingEdges {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot_mut(&mut self, category: TimeCategory) -> &mut Option<u64> {
        match category {
            TimeCategory::Executing => &mut self.executing,
            TimeCategory::SchedWait => &mut self.sched_wait,
            TimeCategory::SyncBlock => &mut self.sync_block,
            TimeCategory::NetWait => &mut self.net_wait,
            TimeCategory::SyscallBlock => &mut self.syscall_block,
            TimeCategory::GcBlock => &mut self.gc_block,
            TimeCategory::Sweeping => &mut self.sweeping,
        }
    }

    /// Start timestamp of the open edge for `category`
    pub fn open_at(&self, category: TimeCategory) -> Option<u64> {
        match category {
            TimeCategory::Executing => self.executing,
            TimeCategory::SchedWait => self.sched_wait,
            TimeCategory::SyncBlock => self.sync_block,
            TimeCategory::NetWait => self.net_wait,
            TimeCategory::SyscallBlock => self.syscall_block,
            TimeCategory::GcBlock => self.gc_block,
            TimeCategory::Sweeping => self.sweeping,
        }
    }

    pub fn is_open(&self, category: TimeCategory) -> bool {
        self.open_at(category).is_some()
    }

    /// The open primary edge, if any
    pub fn open_primary(&self) -> Option<TimeCategory> {
        SETTLE_ORDER
            .iter()
            .copied()
            .find(|c| c.is_primary() && self.is_open(*c))
    }

    /// Number of open primary edges; never more than one
    pub fn open_primary_count(&self) -> usize {
        TimeCategory::ALL
            .iter()
            .filter(|c| c.is_primary() && self.is_open(**c))
            .count()
    }

    /// No edge of any kind is open
    pub fn is_quiescent(&self) -> bool {
        TimeCategory::ALL.iter().all(|c| !self.is_open(*c))
    }

    /// Close the edge for `category` at `now`, charging the elapsed time
    ///
    /// Returns the nanoseconds charged (0 when the edge was not open).
    pub fn close(&mut self, category: TimeCategory, now: u64, record: &mut TaskTimeRecord) -> u64 {
        match self.slot_mut(category).take() {
            Some(opened) => {
                let elapsed = now.saturating_sub(opened);
                record.charge(category, elapsed);
                elapsed
            }
            None => 0,
        }
    }

    /// Close every open primary edge and open `next` at `now`
    ///
    /// `None` leaves the task with no primary edge (sleep, plain park).
    /// The sweep edge is left untouched.
    pub fn switch_to(
        &mut self,
        next: Option<TimeCategory>,
        now: u64,
        record: &mut TaskTimeRecord,
    ) {
        debug_assert!(
            next.map_or(true, TimeCategory::is_primary),
            "sweeping is not a primary edge"
        );

        for category in SETTLE_ORDER.iter().filter(|c| c.is_primary()) {
            self.close(*category, now, record);
        }

        if let Some(category) = next.filter(|c| c.is_primary()) {
            *self.slot_mut(category) = Some(now);
        }
    }

    /// Open the sweep edge; a nested start keeps the earlier timestamp
    pub fn open_sweep(&mut self, now: u64) {
        self.sweeping.get_or_insert(now);
    }

    /// Close the sweep edge, charging `Sweeping`
    pub fn close_sweep(&mut self, now: u64, record: &mut TaskTimeRecord) -> u64 {
        self.close(TimeCategory::Sweeping, now, record)
    }

    /// What finalizing at `at` would yield, without touching any state
    ///
    /// Open edges are charged up to `at` in [`SETTLE_ORDER`]. When a
    /// collection started at `active_gc` is still running, its overlap with
    /// the task's lifetime is added to `GcBlock`. `total` prefers wall
    /// endpoints and falls back to the bucket sum when creation is unknown.
    /// A finalized record is returned unchanged.
    pub fn settle(
        &self,
        record: &TaskTimeRecord,
        at: u64,
        active_gc: Option<u64>,
    ) -> TaskTimeRecord {
        let mut settled = *record;
        if record.is_finalized() {
            return settled;
        }

        if let Some(gc_start) = active_gc {
            settled.charge(
                TimeCategory::GcBlock,
                collection_overlap(gc_start, record.creation_time, at),
            );
        }

        for category in SETTLE_ORDER {
            if let Some(opened) = self.open_at(category) {
                settled.charge(category, at.saturating_sub(opened));
            }
        }

        settled.total = match record.creation_time {
            Some(created) => at.saturating_sub(created),
            None => settled.bucket_sum(),
        };
        settled
    }

    /// Settle at `at`, freeze the record with `end_time = at`, clear all edges
    pub fn finalize(&mut self, record: &mut TaskTimeRecord, at: u64, active_gc: Option<u64>) {
        if record.is_finalized() {
            return;
        }
        *record = self.settle(record, at, active_gc);
        record.end_time = Some(at);
        *self = Self::default();
    }
}
