// Live per-task accounting
//
// Each task owns one LiveAccumulator. The scheduler calls its transition
// methods from the task's own execution context, so there is exactly one
// writer. Any thread may read through a LiveHandle; reads are best-effort
// and may observe the last edge closed slightly late.
//
// Tasks are found by id through LiveRegistry, or as "the task running on
// this thread" through the current-task scope.

mod accumulator;
mod group;
mod registry;

pub use accumulator::{LiveAccumulator, LiveHandle};
pub use group::TaskGroup;
pub use registry::{current_task_id, enter, query_current, CurrentTaskGuard, LiveRegistry};
