// Lookup of live accumulators by task id and by running thread

use super::accumulator::{LiveAccumulator, LiveHandle};
use super::group::TaskGroup;
use crate::category::{TaskId, TaskTimeRecord};
use crate::clock::Clock;
use crate::config;
use crate::error::{Result, StatsError};
use fnv::FnvHashMap;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::{Arc, PoisonError, RwLock};

/// Directory of attached accumulators
///
/// The scheduler attaches an accumulator when it creates a task and evicts
/// it when the task is reclaimed. A task id can only be attached again
/// after eviction.
#[derive(Debug)]
pub struct LiveRegistry {
    tasks: RwLock<FnvHashMap<TaskId, LiveHandle>>,
    clock: Arc<dyn Clock>,
    default_group: TaskGroup,
}

impl LiveRegistry {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            tasks: RwLock::new(FnvHashMap::default()),
            clock,
            default_group: TaskGroup::new(),
        }
    }

    /// Group shared by tasks attached without an explicit group
    pub fn default_group(&self) -> &TaskGroup {
        &self.default_group
    }

    /// Attach a new accumulator for `id` in the default group
    ///
    /// Returns `Ok(None)` while accounting is disabled: the task simply runs
    /// without statistics.
    pub fn attach(&self, id: TaskId) -> Result<Option<LiveAccumulator>> {
        self.attach_in_group(id, self.default_group.clone())
    }

    /// Attach a new accumulator for `id` counted in `group`
    pub fn attach_in_group(&self, id: TaskId, group: TaskGroup) -> Result<Option<LiveAccumulator>> {
        if !config::is_enabled() {
            return Ok(None);
        }

        let mut tasks = self.tasks.write().unwrap_or_else(PoisonError::into_inner);
        if tasks.contains_key(&id) {
            return Err(StatsError::DuplicateTask(id));
        }

        let accumulator = LiveAccumulator::with_group(id, Arc::clone(&self.clock), group);
        tasks.insert(id, accumulator.handle());
        Ok(Some(accumulator))
    }

    /// Detach `id`, returning its last snapshot
    pub fn evict(&self, id: TaskId) -> Option<TaskTimeRecord> {
        let handle = self
            .tasks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)?;
        Some(handle.snapshot())
    }

    /// Read-only handle for `id`
    pub fn handle(&self, id: TaskId) -> Option<LiveHandle> {
        self.tasks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    /// Current statistics for `id`; `None` when nothing is attached
    pub fn query(&self, id: TaskId) -> Option<TaskTimeRecord> {
        self.handle(id).map(|handle| handle.snapshot())
    }

    /// Snapshot of every attached task, ordered by id
    pub fn snapshot_all(&self) -> BTreeMap<TaskId, TaskTimeRecord> {
        let at = self.clock.now_nanos();
        self.tasks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(id, handle)| (*id, handle.snapshot_at(at)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

thread_local! {
    static CURRENT: RefCell<Option<LiveHandle>> = const { RefCell::new(None) };
}

/// Restores the previously running task when dropped
///
/// Not `Send`: the scope belongs to the thread that entered it.
#[derive(Debug)]
#[must_use = "the task is only current while the guard is alive"]
pub struct CurrentTaskGuard {
    previous: Option<LiveHandle>,
    _not_send: PhantomData<*const ()>,
}

impl Drop for CurrentTaskGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CURRENT.with(|current| *current.borrow_mut() = previous);
    }
}

/// Mark `handle` as the task running on this thread
pub fn enter(handle: LiveHandle) -> CurrentTaskGuard {
    let previous = CURRENT.with(|current| current.replace(Some(handle)));
    CurrentTaskGuard {
        previous,
        _not_send: PhantomData,
    }
}

/// Id of the task running on this thread
pub fn current_task_id() -> Option<TaskId> {
    CURRENT.with(|current| current.borrow().as_ref().map(LiveHandle::id))
}

/// Statistics of the task running on this thread
///
/// `None` when no task is current, e.g. accounting was disabled when the
/// task was created. Callers must handle that case.
pub fn query_current() -> Option<TaskTimeRecord> {
    CURRENT.with(|current| current.borrow().as_ref().map(LiveHandle::snapshot))
}
