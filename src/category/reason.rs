// Why a task stopped running

use super::TimeCategory;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reason attached to a block transition
///
/// Mirrors the scheduler's park reasons. Several reasons share a bucket:
/// every channel/mutex/condition flavour lands in `SyncBlock`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "fuzz", derive(arbitrary::Arbitrary))]
#[serde(rename_all = "snake_case")]
pub enum BlockReason {
    /// Channel send
    Send,
    /// Channel receive
    Recv,
    /// Multi-way select
    Select,
    /// Mutex or other sync primitive
    Sync,
    /// Condition variable
    Cond,
    /// Network poller
    Net,
    /// Blocking system call
    Syscall,
    /// Waiting for the collector
    Gc,
    /// Timed sleep
    Sleep,
    /// Unclassified park
    Plain,
    /// Task is stopping for good
    Stop,
}

impl BlockReason {
    /// Bucket the task waits in, or `None` when blocking opens no edge
    pub fn category(self) -> Option<TimeCategory> {
        match self {
            BlockReason::Send
            | BlockReason::Recv
            | BlockReason::Select
            | BlockReason::Sync
            | BlockReason::Cond => Some(TimeCategory::SyncBlock),
            BlockReason::Net => Some(TimeCategory::NetWait),
            BlockReason::Syscall => Some(TimeCategory::SyscallBlock),
            BlockReason::Gc => Some(TimeCategory::GcBlock),
            BlockReason::Sleep | BlockReason::Plain | BlockReason::Stop => None,
        }
    }

    /// `Stop` finalizes the task instead of parking it
    pub fn is_terminal(self) -> bool {
        matches!(self, BlockReason::Stop)
    }

    pub fn name(self) -> &'static str {
        match self {
            BlockReason::Send => "send",
            BlockReason::Recv => "recv",
            BlockReason::Select => "select",
            BlockReason::Sync => "sync",
            BlockReason::Cond => "cond",
            BlockReason::Net => "net",
            BlockReason::Syscall => "syscall",
            BlockReason::Gc => "gc",
            BlockReason::Sleep => "sleep",
            BlockReason::Plain => "plain",
            BlockReason::Stop => "stop",
        }
    }
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
