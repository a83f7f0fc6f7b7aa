// Single-writer live accumulator and its read-only handle

use super::group::TaskGroup;
use crate::category::{BlockReason, PendingEdges, TaskId, TaskTimeRecord, TimeCategory};
use crate::clock::Clock;
use crate::config;
use crate::error::{Result, StatsError};
use crossbeam::atomic::AtomicCell;
use std::sync::Arc;

/// Record plus open edges, published as one unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LiveState {
    record: TaskTimeRecord,
    edges: PendingEdges,
}

impl LiveState {
    fn new(id: TaskId) -> Self {
        Self {
            record: TaskTimeRecord::new(id),
            edges: PendingEdges::new(),
        }
    }

    /// The first callback on a never-created task stands in for creation
    fn touch(&mut self, now: u64) {
        self.record.creation_time.get_or_insert(now);
    }

    fn switch_to(&mut self, next: Option<TimeCategory>, now: u64) {
        self.touch(now);
        self.edges.switch_to(next, now, &mut self.record);
    }
}

/// Per-task accumulator driven by scheduler transition callbacks
///
/// Mutating methods take `&mut self`: only the owning task (or the
/// scheduler acting on its behalf) can drive it. Other threads read through
/// [`LiveHandle`].
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use taskclock::category::BlockReason;
/// use taskclock::clock::ManualClock;
/// use taskclock::live::LiveAccumulator;
///
/// let clock = Arc::new(ManualClock::new(0));
/// let mut task = LiveAccumulator::new(1, clock.clone());
///
/// task.on_create()?;
/// clock.set(5);
/// task.on_start()?;
/// clock.set(100);
/// task.on_block(BlockReason::Recv)?;
/// clock.set(150);
/// task.on_unblock()?;
///
/// let snap = task.snapshot();
/// assert_eq!(snap.executing, 95);
/// assert_eq!(snap.sync_block, 50);
/// assert_eq!(snap.total, 150);
/// # Ok::<(), taskclock::error::StatsError>(())
/// ```
#[derive(Debug)]
pub struct LiveAccumulator {
    id: TaskId,
    state: Arc<AtomicCell<LiveState>>,
    clock: Arc<dyn Clock>,
    group: TaskGroup,
}

impl LiveAccumulator {
    /// Accumulator for task `id` in a group of its own
    pub fn new(id: TaskId, clock: Arc<dyn Clock>) -> Self {
        Self::with_group(id, clock, TaskGroup::new())
    }

    /// Accumulator for task `id` counted in `group`
    pub fn with_group(id: TaskId, clock: Arc<dyn Clock>, group: TaskGroup) -> Self {
        Self {
            id,
            state: Arc::new(AtomicCell::new(LiveState::new(id))),
            clock,
            group,
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn group(&self) -> &TaskGroup {
        &self.group
    }

    /// Read-only view for other threads
    pub fn handle(&self) -> LiveHandle {
        LiveHandle {
            id: self.id,
            state: Arc::clone(&self.state),
            clock: Arc::clone(&self.clock),
        }
    }

    fn transition<F>(&mut self, event: &'static str, apply: F) -> Result<()>
    where
        F: FnOnce(&mut LiveState, u64),
    {
        if !config::is_enabled() {
            return Ok(());
        }

        let mut state = self.state.load();
        if state.record.is_finalized() {
            return Err(StatsError::EventAfterEnd {
                task: self.id,
                event,
            });
        }

        let now = self.clock.now_nanos();
        apply(&mut state, now);
        self.state.store(state);

        if config::debug_enabled() {
            tracing::trace!(
                task = self.id,
                event,
                ts = now,
                open = ?state.edges.open_primary(),
                "live transition"
            );
        }
        Ok(())
    }

    /// Task created: starts waiting for a scheduler slot
    ///
    /// No-op when the task is already created.
    pub fn on_create(&mut self) -> Result<()> {
        self.transition("create", |state, now| {
            if state.record.creation_time.is_none() {
                state.switch_to(Some(TimeCategory::SchedWait), now);
            }
        })
    }

    /// Task scheduled onto a worker
    pub fn on_start(&mut self) -> Result<()> {
        self.transition("start", |state, now| {
            state.record.start_time.get_or_insert(now);
            state.switch_to(Some(TimeCategory::Executing), now);
        })?;
        self.group.record_tick();
        Ok(())
    }

    /// Task gave up its slot voluntarily and is runnable again
    pub fn on_yield(&mut self) -> Result<()> {
        self.transition("yield", |state, now| {
            state.switch_to(Some(TimeCategory::SchedWait), now);
        })
    }

    /// Task was descheduled by the scheduler and is runnable again
    pub fn on_preempt(&mut self) -> Result<()> {
        self.transition("preempt", |state, now| {
            state.switch_to(Some(TimeCategory::SchedWait), now);
        })
    }

    /// Task parked for `reason`
    ///
    /// Sleep and plain parks only close the execution edge. `Stop`
    /// finalizes the task.
    pub fn on_block(&mut self, reason: BlockReason) -> Result<()> {
        if reason.is_terminal() {
            return self.finish("stop");
        }
        self.transition(reason.name(), |state, now| {
            state.switch_to(reason.category(), now);
        })
    }

    /// Task made runnable after a block
    pub fn on_unblock(&mut self) -> Result<()> {
        self.transition("unblock", |state, now| {
            state.switch_to(Some(TimeCategory::SchedWait), now);
        })
    }

    /// Task entered a blocking system call
    pub fn on_syscall_enter(&mut self) -> Result<()> {
        self.transition("syscall_enter", |state, now| {
            state.switch_to(Some(TimeCategory::SyscallBlock), now);
        })
    }

    /// Task returned from a system call and waits to be rescheduled
    pub fn on_syscall_exit(&mut self) -> Result<()> {
        self.transition("syscall_exit", |state, now| {
            state.switch_to(Some(TimeCategory::SchedWait), now);
        })
    }

    /// Task began assisting the collector's sweep
    ///
    /// Ignored once the task is finalized: late sweep callbacks can race
    /// task teardown.
    pub fn on_sweep_start(&mut self) {
        self.sweep("sweep_start", |state, now| state.edges.open_sweep(now));
    }

    /// Task finished its sweep assist
    pub fn on_sweep_done(&mut self) {
        self.sweep("sweep_done", |state, now| {
            state.edges.close_sweep(now, &mut state.record);
        });
    }

    fn sweep<F>(&mut self, event: &'static str, apply: F)
    where
        F: FnOnce(&mut LiveState, u64),
    {
        if self.is_finalized() {
            return;
        }
        // Only the owner mutates, so the record is still open here
        let applied = self.transition(event, apply);
        debug_assert!(applied.is_ok(), "sweep on an open task cannot fail");
    }

    /// Task terminated: close every edge and freeze the record
    pub fn on_end(&mut self) -> Result<()> {
        self.finish("end")
    }

    fn finish(&mut self, event: &'static str) -> Result<()> {
        self.transition(event, |state, now| {
            state.touch(now);
            state.edges.finalize(&mut state.record, now, None);
        })
    }

    pub fn is_finalized(&self) -> bool {
        self.state.load().record.is_finalized()
    }

    /// Finalize-as-of-now without ending the task
    pub fn snapshot(&self) -> TaskTimeRecord {
        self.handle().snapshot()
    }

    /// Finalize-as-of-`at` without ending the task
    pub fn snapshot_at(&self, at: u64) -> TaskTimeRecord {
        self.handle().snapshot_at(at)
    }
}

/// Cloneable read-only view of a [`LiveAccumulator`]
#[derive(Debug, Clone)]
pub struct LiveHandle {
    id: TaskId,
    state: Arc<AtomicCell<LiveState>>,
    clock: Arc<dyn Clock>,
}

impl LiveHandle {
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Record as it would look if the task were finalized now
    ///
    /// Open edges stay open; repeated calls with no intervening transition
    /// only differ by the time that passed between them.
    pub fn snapshot(&self) -> TaskTimeRecord {
        // Load before reading the clock so `now` is never older than an edge
        let state = self.state.load();
        let now = self.clock.now_nanos();
        state.edges.settle(&state.record, now, None)
    }

    /// Record as it would look if the task were finalized at `at`
    pub fn snapshot_at(&self, at: u64) -> TaskTimeRecord {
        let state = self.state.load();
        state.edges.settle(&state.record, at, None)
    }

    pub fn is_finalized(&self) -> bool {
        self.state.load().record.is_finalized()
    }
}
