// Routing of trace events to per-task state
//
// Each worker owns a collector holding the tasks created on it. Events that
// name a task explicitly (start, unblock, syscall exit) may refer to a task
// that migrated from another worker, so lookup is an ordered search:
// the worker's own map, then every worker map in index order, then the
// global map. Worst case O(workers), fine for realistic worker counts.

use crate::category::{PendingEdges, TaskId, TaskTimeRecord, TimeCategory};
use crate::config::MAX_WORKERS;
use crate::error::{ReplayError, ReplayResult};
use fnv::FnvHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Execution context an event was recorded on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "fuzz", derive(arbitrary::Arbitrary))]
#[serde(from = "Option<u32>", into = "Option<u32>")]
pub enum WorkerId {
    /// Events not attributed to any worker
    #[default]
    Global,
    /// Worker with a stable index
    Local(u32),
}

impl WorkerId {
    pub fn index(self) -> Option<usize> {
        match self {
            WorkerId::Global => None,
            WorkerId::Local(n) => Some(n as usize),
        }
    }
}

impl From<Option<u32>> for WorkerId {
    fn from(worker: Option<u32>) -> Self {
        worker.map_or(WorkerId::Global, WorkerId::Local)
    }
}

impl From<WorkerId> for Option<u32> {
    fn from(worker: WorkerId) -> Self {
        match worker {
            WorkerId::Global => None,
            WorkerId::Local(n) => Some(n),
        }
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerId::Global => f.write_str("global"),
            WorkerId::Local(n) => write!(f, "p{}", n),
        }
    }
}

/// Replay-side state of one task: its record plus open edges
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskDesc {
    record: TaskTimeRecord,
    edges: PendingEdges,
}

impl TaskDesc {
    /// Task created at `ts`, waiting for its first scheduling
    pub fn created(id: TaskId, ts: u64) -> Self {
        let mut desc = Self {
            record: TaskTimeRecord::created_at(id, ts),
            edges: PendingEdges::new(),
        };
        desc.switch_to(Some(TimeCategory::SchedWait), ts);
        desc
    }

    pub fn id(&self) -> TaskId {
        self.record.id
    }

    /// Accumulated record, without open edges charged
    pub fn record(&self) -> &TaskTimeRecord {
        &self.record
    }

    pub fn edges(&self) -> &PendingEdges {
        &self.edges
    }

    pub fn is_finalized(&self) -> bool {
        self.record.is_finalized()
    }

    pub(crate) fn switch_to(&mut self, next: Option<TimeCategory>, ts: u64) {
        self.edges.switch_to(next, ts, &mut self.record);
    }

    pub(crate) fn start(&mut self, ts: u64) {
        self.record.start_time.get_or_insert(ts);
        self.switch_to(Some(TimeCategory::Executing), ts);
    }

    pub(crate) fn open_sweep(&mut self, ts: u64) {
        self.edges.open_sweep(ts);
    }

    pub(crate) fn close_sweep(&mut self, ts: u64) {
        self.edges.close_sweep(ts, &mut self.record);
    }

    /// Charge the part of a finished collection this task lived through
    pub(crate) fn charge_collection(&mut self, gc_start: u64, done: u64) {
        if self.is_finalized() {
            return;
        }
        let overlap =
            crate::category::collection_overlap(gc_start, self.record.creation_time, done);
        self.record.charge(TimeCategory::GcBlock, overlap);
    }

    /// Record as if finalized at `at`, with a collection possibly in flight
    pub fn snapshot(&self, at: u64, active_gc: Option<u64>) -> TaskTimeRecord {
        self.edges.settle(&self.record, at, active_gc)
    }

    pub(crate) fn finalize(&mut self, at: u64, active_gc: Option<u64>) {
        self.edges.finalize(&mut self.record, at, active_gc);
    }

    pub fn into_record(self) -> TaskTimeRecord {
        self.record
    }
}

/// Tasks created on one worker plus that worker's scheduling cursor
#[derive(Debug, Clone, Default)]
pub struct WorkerCollector {
    tasks: FnvHashMap<TaskId, TaskDesc>,
    /// Last active task per worker context, saved across batches
    last_tasks: FnvHashMap<WorkerId, TaskId>,
    last_task: Option<TaskId>,
    last_worker: WorkerId,
}

impl WorkerCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_task(&self) -> Option<TaskId> {
        self.last_task
    }

    pub fn last_worker(&self) -> WorkerId {
        self.last_worker
    }

    pub fn contains(&self, task: TaskId) -> bool {
        self.tasks.contains_key(&task)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Save the running task for the current context and resume `next`'s
    fn batch(&mut self, next: WorkerId) {
        match self.last_task {
            Some(task) => {
                self.last_tasks.insert(self.last_worker, task);
            }
            None => {
                self.last_tasks.remove(&self.last_worker);
            }
        }
        self.last_worker = next;
        self.last_task = self.last_tasks.get(&next).copied();
    }
}

/// Per-worker collectors plus the global one
///
/// # Example
/// ```
/// use taskclock::replay::{TaskDesc, WorkerDemux, WorkerId};
///
/// let mut demux = WorkerDemux::new();
/// demux.insert(WorkerId::Local(0), TaskDesc::created(7, 0)).unwrap();
///
/// // Found from another worker through the ordered search
/// assert_eq!(demux.locate(WorkerId::Local(3), 7), Some(WorkerId::Local(0)));
/// assert!(demux.resolve(WorkerId::Global, 8).is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct WorkerDemux {
    workers: Vec<WorkerCollector>,
    global: WorkerCollector,
}

impl WorkerDemux {
    pub fn new() -> Self {
        Self::default()
    }

    /// Demux with `count` workers allocated up front
    pub fn with_workers(count: usize) -> Self {
        Self {
            workers: vec![WorkerCollector::new(); count.min(MAX_WORKERS)],
            global: WorkerCollector::new(),
        }
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    fn collector(&self, worker: WorkerId) -> Option<&WorkerCollector> {
        match worker.index() {
            None => Some(&self.global),
            Some(i) => self.workers.get(i),
        }
    }

    /// Collector for `worker`, growing the worker table if needed
    fn collector_mut(&mut self, worker: WorkerId) -> ReplayResult<&mut WorkerCollector> {
        let index = match worker.index() {
            None => return Ok(&mut self.global),
            Some(i) if i >= MAX_WORKERS => {
                return Err(ReplayError::WorkerOutOfRange { worker });
            }
            Some(i) => i,
        };
        if index >= self.workers.len() {
            self.workers.resize_with(index + 1, WorkerCollector::new);
        }
        Ok(&mut self.workers[index])
    }

    /// Task last scheduled on `worker`
    pub fn last_task(&self, worker: WorkerId) -> Option<TaskId> {
        self.collector(worker).and_then(WorkerCollector::last_task)
    }

    pub fn set_last_task(&mut self, worker: WorkerId, task: Option<TaskId>) -> ReplayResult<()> {
        self.collector_mut(worker)?.last_task = task;
        Ok(())
    }

    /// Switch `worker` to the `next` scheduling context
    pub fn batch(&mut self, worker: WorkerId, next: WorkerId) -> ReplayResult<()> {
        self.collector_mut(worker)?.batch(next);
        Ok(())
    }

    /// Whether `task` is known to any collector
    pub fn contains(&self, task: TaskId) -> bool {
        self.global.contains(task) || self.workers.iter().any(|c| c.contains(task))
    }

    /// Register a newly created task on `worker`
    pub fn insert(&mut self, worker: WorkerId, desc: TaskDesc) -> ReplayResult<()> {
        let id = desc.id();
        if self.contains(id) {
            return Err(ReplayError::DuplicateTask(id));
        }
        self.collector_mut(worker)?.tasks.insert(id, desc);
        Ok(())
    }

    /// Collector holding `task`, searched from `worker`'s point of view
    pub fn locate(&self, worker: WorkerId, task: TaskId) -> Option<WorkerId> {
        if let WorkerId::Local(n) = worker {
            if self.collector(worker).is_some_and(|c| c.contains(task)) {
                return Some(WorkerId::Local(n));
            }
        }

        // TODO: keep a task -> worker index if replay throughput on wide traces matters
        if let Some(i) = self.workers.iter().position(|c| c.contains(task)) {
            return u32::try_from(i).ok().map(WorkerId::Local);
        }

        self.global.contains(task).then_some(WorkerId::Global)
    }

    pub fn resolve(&self, worker: WorkerId, task: TaskId) -> Option<&TaskDesc> {
        let owner = self.locate(worker, task)?;
        self.collector(owner)?.tasks.get(&task)
    }

    pub fn resolve_mut(&mut self, worker: WorkerId, task: TaskId) -> Option<&mut TaskDesc> {
        let owner = self.locate(worker, task)?;
        let collector = match owner.index() {
            None => &mut self.global,
            Some(i) => self.workers.get_mut(i)?,
        };
        collector.tasks.get_mut(&task)
    }

    /// Every task, worker collectors first, then the global one
    pub fn tasks(&self) -> impl Iterator<Item = &TaskDesc> {
        self.workers
            .iter()
            .chain(std::iter::once(&self.global))
            .flat_map(|c| c.tasks.values())
    }

    pub fn tasks_mut(&mut self) -> impl Iterator<Item = &mut TaskDesc> {
        self.workers
            .iter_mut()
            .chain(std::iter::once(&mut self.global))
            .flat_map(|c| c.tasks.values_mut())
    }

    pub fn into_tasks(self) -> impl Iterator<Item = TaskDesc> {
        self.workers
            .into_iter()
            .chain(std::iter::once(self.global))
            .flat_map(|c| c.tasks.into_values())
    }

    pub fn task_count(&self) -> usize {
        self.global.len() + self.workers.iter().map(WorkerCollector::len).sum::<usize>()
    }
}
