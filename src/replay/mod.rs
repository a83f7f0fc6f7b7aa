// Trace replay: per-task time attribution from a captured event log
//
// Unlike the live accumulator, replay owns every task's state at once and
// runs single-threaded over an already ordered log.

mod accumulator;
mod demux;
mod event;

pub use accumulator::{replay, ReplayAccumulator, ReplayReport};
pub use demux::{TaskDesc, WorkerCollector, WorkerDemux, WorkerId};
pub use event::{parse_jsonl, read_jsonl_file, sort_for_replay, write_jsonl, EventKind, TraceEvent};

#[cfg(test)]
mod tests;
