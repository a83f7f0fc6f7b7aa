// Time category enumeration and the accumulated record payload

use super::TaskId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Mutually exclusive time buckets a task's lifetime is split into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeCategory {
    /// Running on a worker
    Executing,
    /// Runnable, waiting for a scheduler slot
    SchedWait,
    /// Blocked on a channel, mutex or condition
    SyncBlock,
    /// Blocked on network I/O
    NetWait,
    /// Blocked in a system call
    SyscallBlock,
    /// Blocked on (or overlapping) a collection pause
    GcBlock,
    /// Assisting the collector's sweep phase
    Sweeping,
}

impl TimeCategory {
    /// Every category, in record field order
    pub const ALL: [TimeCategory; 7] = [
        TimeCategory::Executing,
        TimeCategory::SchedWait,
        TimeCategory::SyncBlock,
        TimeCategory::NetWait,
        TimeCategory::SyscallBlock,
        TimeCategory::GcBlock,
        TimeCategory::Sweeping,
    ];

    /// Short stable name used in reports
    pub fn name(self) -> &'static str {
        match self {
            TimeCategory::Executing => "exec",
            TimeCategory::SchedWait => "sched_wait",
            TimeCategory::SyncBlock => "sync_block",
            TimeCategory::NetWait => "net_wait",
            TimeCategory::SyscallBlock => "syscall",
            TimeCategory::GcBlock => "gc",
            TimeCategory::Sweeping => "gc_sweep",
        }
    }

    /// Primary categories are mutually exclusive; sweeping is layered on top.
    pub fn is_primary(self) -> bool {
        !matches!(self, TimeCategory::Sweeping)
    }

    /// Categories in which the task is blocked rather than running or runnable
    pub fn is_blocking(self) -> bool {
        matches!(
            self,
            TimeCategory::SyncBlock
                | TimeCategory::NetWait
                | TimeCategory::SyscallBlock
                | TimeCategory::GcBlock
        )
    }
}

impl fmt::Display for TimeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Cumulative time attribution for one task
///
/// All durations are nanoseconds. Buckets only grow while the task is alive;
/// once `end_time` is set the record is frozen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskTimeRecord {
    /// Task identity
    pub id: TaskId,

    /// Time spent running
    pub executing: u64,

    /// Time spent runnable but not running
    pub sched_wait: u64,

    /// Time blocked on synchronization primitives
    pub sync_block: u64,

    /// Time blocked on network I/O
    pub net_wait: u64,

    /// Time blocked in system calls
    pub syscall_block: u64,

    /// Time blocked on, or overlapping, collection pauses
    pub gc_block: u64,

    /// Time spent sweeping for the collector
    pub sweeping: u64,

    /// Wall-clock lifetime (end or snapshot instant minus creation)
    pub total: u64,

    /// When the task was created
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub creation_time: Option<u64>,

    /// When the task was first scheduled
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub start_time: Option<u64>,

    /// When the task ended; `None` while alive
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub end_time: Option<u64>,
}

impl TaskTimeRecord {
    /// Empty record for a task whose creation has not been observed
    pub fn new(id: TaskId) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    /// Empty record for a task created at `ts`
    pub fn created_at(id: TaskId, ts: u64) -> Self {
        Self {
            id,
            creation_time: Some(ts),
            ..Self::default()
        }
    }

    /// Raw nanoseconds accumulated in `category`
    pub fn bucket(&self, category: TimeCategory) -> u64 {
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

    fn bucket_mut(&mut self, category: TimeCategory) -> &mut u64 {
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

    /// Time accumulated in `category`
    pub fn get(&self, category: TimeCategory) -> Duration {
        Duration::from_nanos(self.bucket(category))
    }

    /// Add `nanos` to `category`
    pub fn charge(&mut self, category: TimeCategory, nanos: u64) {
        let bucket = self.bucket_mut(category);
        *bucket = bucket.saturating_add(nanos);
    }

    /// Sum of all seven buckets
    pub fn bucket_sum(&self) -> u64 {
        TimeCategory::ALL
            .iter()
            .fold(0u64, |acc, c| acc.saturating_add(self.bucket(*c)))
    }

    /// Sum of the mutually exclusive buckets (everything except sweeping)
    ///
    /// For a live accumulator this equals `total` at every snapshot.
    pub fn primary_sum(&self) -> u64 {
        TimeCategory::ALL
            .iter()
            .filter(|c| c.is_primary())
            .fold(0u64, |acc, c| acc.saturating_add(self.bucket(*c)))
    }

    /// Lifetime not covered by any primary bucket
    ///
    /// Sleep and plain parks close the execution edge without opening a new
    /// one; the time until the task is runnable again lands here.
    pub fn unattributed(&self) -> u64 {
        self.total.saturating_sub(self.primary_sum())
    }

    /// Whether the task has ended and the record is frozen
    pub fn is_finalized(&self) -> bool {
        self.end_time.is_some()
    }

    pub fn total_time(&self) -> Duration {
        Duration::from_nanos(self.total)
    }

    pub fn exec_time(&self) -> Duration {
        self.get(TimeCategory::Executing)
    }

    pub fn sched_wait_time(&self) -> Duration {
        self.get(TimeCategory::SchedWait)
    }

    pub fn io_time(&self) -> Duration {
        self.get(TimeCategory::NetWait)
    }

    pub fn block_time(&self) -> Duration {
        self.get(TimeCategory::SyncBlock)
    }

    pub fn syscall_time(&self) -> Duration {
        self.get(TimeCategory::SyscallBlock)
    }

    pub fn gc_time(&self) -> Duration {
        self.get(TimeCategory::GcBlock)
    }

    pub fn sweep_time(&self) -> Duration {
        self.get(TimeCategory::Sweeping)
    }

    /// The category holding the most time, if any time was attributed
    pub fn dominant(&self) -> Option<TimeCategory> {
        TimeCategory::ALL
            .iter()
            .copied()
            .filter(|c| self.bucket(*c) > 0)
            .max_by_key(|c| self.bucket(*c))
    }
}

impl fmt::Display for TaskTimeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "total: {:?}, exec: {:?}, io: {:?}, block: {:?}, syscall: {:?}, sched_wait: {:?}, gc: {:?}, gc_sweep: {:?}",
            self.total_time(),
            self.exec_time(),
            self.io_time(),
            self.block_time(),
            self.syscall_time(),
            self.sched_wait_time(),
            self.gc_time(),
            self.sweep_time()
        )
    }
}
