//! Error types for the live and replay accumulators
//!
//! Nothing here is fatal. A missing record is not an error at all (queries
//! return `None`); the variants below are the conditions callers must be
//! able to tell apart from a plain absence.

use crate::category::TaskId;
use crate::replay::WorkerId;
use thiserror::Error;

/// Errors raised by the live accumulator and its registry
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StatsError {
    /// A lifecycle callback arrived after the task was finalized.
    /// Indicates an ordering bug in the scheduler, not a normal absence.
    #[error("task {task}: {event} after end")]
    EventAfterEnd { task: TaskId, event: &'static str },

    #[error("task {0} already has an attached accumulator")]
    DuplicateTask(TaskId),
}

/// Result type for live accumulator operations
pub type Result<T> = std::result::Result<T, StatsError>;

/// Errors raised while folding a trace
///
/// All of them are recoverable: [`crate::replay::replay`] drops the
/// offending event and keeps going, since captured traces are routinely
/// truncated at the start.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReplayError {
    #[error("{event} on {worker} references task {task} which was never created")]
    UnknownTask {
        worker: WorkerId,
        task: TaskId,
        event: &'static str,
    },

    #[error("{event} on {worker} with no active task")]
    NoActiveTask {
        worker: WorkerId,
        event: &'static str,
    },

    #[error("task {0} created twice")]
    DuplicateTask(TaskId),

    #[error("task {task}: {event} after end")]
    EventAfterEnd { task: TaskId, event: &'static str },

    #[error("collection done at {ts} without a matching start")]
    GcNotActive { ts: u64 },

    #[error("worker {worker} exceeds the supported worker count")]
    WorkerOutOfRange { worker: WorkerId },
}

/// Result type for trace replay operations
pub type ReplayResult<T> = std::result::Result<T, ReplayError>;

impl ReplayError {
    /// Task the error is about, when there is one
    pub fn task(&self) -> Option<TaskId> {
        match self {
            ReplayError::UnknownTask { task, .. }
            | ReplayError::EventAfterEnd { task, .. }
            | ReplayError::DuplicateTask(task) => Some(*task),
            ReplayError::NoActiveTask { .. }
            | ReplayError::GcNotActive { .. }
            | ReplayError::WorkerOutOfRange { .. } => None,
        }
    }
}
