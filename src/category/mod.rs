// Time categories and per-task time records
//
// A task's wall-clock lifetime is split into mutually exclusive buckets:
// executing, waiting for a scheduler slot, and one of several blocked
// states. Collector sweeping is charged on top of whatever the task is
// otherwise doing.
//
// Both accumulators (live and trace replay) share this model. They differ
// only in where events come from and how the collection window is charged.

mod edges;
mod reason;
mod record;

pub use edges::{collection_overlap, PendingEdges, SETTLE_ORDER};
pub use reason::BlockReason;
pub use record::{TaskTimeRecord, TimeCategory};

/// Task identity: unique among live tasks, reused only after eviction.
pub type TaskId = u64;
