// Fold an ordered trace into per-task records

use super::demux::{TaskDesc, WorkerDemux, WorkerId};
use super::event::{EventKind, TraceEvent};
use crate::category::{TaskId, TaskTimeRecord, TimeCategory};
use crate::config;
use crate::error::{ReplayError, ReplayResult};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::BTreeMap;

/// Outcome of replaying a whole trace
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayReport {
    /// Final record per task, ordered by id
    pub records: BTreeMap<TaskId, TaskTimeRecord>,
    /// Latest timestamp seen; open tasks were finalized here
    pub last_timestamp: u64,
    /// Events that changed state
    pub events_applied: u64,
    /// Events dropped as inconsistent
    pub dropped: u64,
}

impl ReplayReport {
    pub fn get(&self, task: TaskId) -> Option<&TaskTimeRecord> {
        self.records.get(&task)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Trace-replay accumulator
///
/// Events must be fed in timestamp order, stable per worker (see
/// [`super::sort_for_replay`]). Collection time is charged only through the
/// `GcStart`/`GcDone` window: every task alive during the window is charged
/// the part of it that overlaps its lifetime.
///
/// # Example
/// ```
/// use taskclock::category::BlockReason;
/// use taskclock::replay::{EventKind, ReplayAccumulator, TraceEvent};
///
/// let mut acc = ReplayAccumulator::new();
/// acc.apply(&TraceEvent::local(0, 0, EventKind::Create { task: 1 })).unwrap();
/// acc.apply(&TraceEvent::local(0, 5, EventKind::Start { task: 1 })).unwrap();
/// acc.apply(&TraceEvent::local(0, 100, EventKind::Block { reason: BlockReason::Sync })).unwrap();
///
/// let snap = acc.snapshot(1).unwrap();
/// assert_eq!(snap.executing, 95);
/// assert_eq!(snap.total, 100);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ReplayAccumulator {
    demux: WorkerDemux,
    gc_start: Option<u64>,
    last_ts: u64,
    events_applied: u64,
    dropped: u64,
}

impl ReplayAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulator with `workers` collectors allocated up front
    pub fn with_workers(workers: usize) -> Self {
        Self {
            demux: WorkerDemux::with_workers(workers),
            ..Self::default()
        }
    }

    pub fn demux(&self) -> &WorkerDemux {
        &self.demux
    }

    /// Start of the collection in progress, if any
    pub fn active_collection(&self) -> Option<u64> {
        self.gc_start
    }

    pub fn last_timestamp(&self) -> u64 {
        self.last_ts
    }

    pub fn events_applied(&self) -> u64 {
        self.events_applied
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Apply one event
    ///
    /// On error nothing but the worker's scheduling cursor may have changed;
    /// the caller decides whether to drop the event and continue.
    pub fn apply(&mut self, event: &TraceEvent) -> ReplayResult<()> {
        self.last_ts = self.last_ts.max(event.ts);

        if config::debug_enabled() {
            tracing::trace!(
                worker = %event.worker,
                ts = event.ts,
                event = event.kind.name(),
                last_task = ?self.demux.last_task(event.worker),
                "replay event"
            );
        }

        self.dispatch(event)?;
        self.events_applied += 1;
        Ok(())
    }

    /// Apply every event, dropping the ones that fail
    pub fn feed<I>(&mut self, events: I)
    where
        I: IntoIterator,
        I::Item: Borrow<TraceEvent>,
    {
        for event in events {
            let event = event.borrow();
            if let Err(err) = self.apply(event) {
                tracing::warn!(
                    worker = %event.worker,
                    ts = event.ts,
                    "dropping event: {}",
                    err
                );
                self.dropped += 1;
            }
        }
    }

    fn dispatch(&mut self, event: &TraceEvent) -> ReplayResult<()> {
        let TraceEvent { worker, ts, kind } = *event;
        let gc_start = self.gc_start;
        let name = kind.name();

        match kind {
            EventKind::Batch { next } => self.demux.batch(worker, next),
            EventKind::Create { task } => self.demux.insert(worker, TaskDesc::created(task, ts)),
            EventKind::Start { task } => {
                self.demux.set_last_task(worker, Some(task))?;
                self.target(worker, task, name)?.start(ts);
                Ok(())
            }
            EventKind::End | EventKind::Stop => {
                self.deschedule(worker, name, |desc| desc.finalize(ts, gc_start))
            }
            EventKind::Block { reason } if reason.is_terminal() => {
                self.deschedule(worker, name, |desc| desc.finalize(ts, gc_start))
            }
            EventKind::Block { reason } => {
                // Collection time comes from the GcStart/GcDone window only
                let next = reason
                    .category()
                    .filter(|category| *category != TimeCategory::GcBlock);
                self.deschedule(worker, name, |desc| desc.switch_to(next, ts))
            }
            EventKind::Sched | EventKind::Preempt => self.deschedule(worker, name, |desc| {
                desc.switch_to(Some(TimeCategory::SchedWait), ts)
            }),
            EventKind::SyscallEnter => self.deschedule(worker, name, |desc| {
                desc.switch_to(Some(TimeCategory::SyscallBlock), ts)
            }),
            EventKind::Unblock { task } | EventKind::SyscallExit { task } => {
                self.target(worker, task, name)?
                    .switch_to(Some(TimeCategory::SchedWait), ts);
                Ok(())
            }
            EventKind::SweepStart => {
                if let Some(desc) = self.sweeper(worker) {
                    desc.open_sweep(ts);
                }
                Ok(())
            }
            EventKind::SweepDone => {
                if let Some(desc) = self.sweeper(worker) {
                    desc.close_sweep(ts);
                }
                Ok(())
            }
            EventKind::GcStart => {
                self.gc_start.get_or_insert(ts);
                Ok(())
            }
            EventKind::GcDone => {
                let start = self.gc_start.take().ok_or(ReplayError::GcNotActive { ts })?;
                for desc in self.demux.tasks_mut() {
                    desc.charge_collection(start, ts);
                }
                Ok(())
            }
        }
    }

    /// Unfinalized task `task`, found from `worker`
    fn target(&mut self, worker: WorkerId, task: TaskId, event: &'static str) -> ReplayResult<&mut TaskDesc> {
        let desc = self
            .demux
            .resolve_mut(worker, task)
            .ok_or(ReplayError::UnknownTask { worker, task, event })?;
        if desc.is_finalized() {
            return Err(ReplayError::EventAfterEnd { task, event });
        }
        Ok(desc)
    }

    /// Take the running task off `worker` and update it
    ///
    /// The worker stops running the task even if the task turns out to be
    /// unknown, so the cursor is cleared before resolving it.
    fn deschedule<F>(&mut self, worker: WorkerId, event: &'static str, update: F) -> ReplayResult<()>
    where
        F: FnOnce(&mut TaskDesc),
    {
        let task = self
            .demux
            .last_task(worker)
            .ok_or(ReplayError::NoActiveTask { worker, event })?;
        self.demux.set_last_task(worker, None)?;
        update(self.target(worker, task, event)?);
        Ok(())
    }

    /// Running task on `worker` if it can take a sweep charge
    ///
    /// Sweeps with no running task, or racing the task's end, are ignored.
    fn sweeper(&mut self, worker: WorkerId) -> Option<&mut TaskDesc> {
        let task = self.demux.last_task(worker)?;
        self.demux
            .resolve_mut(worker, task)
            .filter(|desc| !desc.is_finalized())
    }

    /// Non-destructive query as of the latest timestamp seen
    pub fn snapshot(&self, task: TaskId) -> Option<TaskTimeRecord> {
        self.snapshot_at(task, self.last_ts)
    }

    /// Non-destructive query as of `at`
    pub fn snapshot_at(&self, task: TaskId, at: u64) -> Option<TaskTimeRecord> {
        self.demux
            .resolve(WorkerId::Global, task)
            .map(|desc| desc.snapshot(at, self.gc_start))
    }

    /// Snapshot of every task as of the latest timestamp seen
    pub fn records(&self) -> BTreeMap<TaskId, TaskTimeRecord> {
        self.demux
            .tasks()
            .map(|desc| (desc.id(), desc.snapshot(self.last_ts, self.gc_start)))
            .collect()
    }

    /// Finalize every open task at the latest timestamp and hand back the
    /// records
    pub fn finish(self) -> ReplayReport {
        let Self {
            demux,
            gc_start,
            last_ts,
            events_applied,
            dropped,
        } = self;

        let records = demux
            .into_tasks()
            .map(|mut desc| {
                if !desc.is_finalized() {
                    tracing::debug!(task = desc.id(), ts = last_ts, "finalizing open task at end of trace");
                    desc.finalize(last_ts, gc_start);
                }
                (desc.id(), desc.into_record())
            })
            .collect();

        ReplayReport {
            records,
            last_timestamp: last_ts,
            events_applied,
            dropped,
        }
    }
}

/// Replay a whole ordered trace
///
/// Inconsistent events (unknown task, event after end, collection done
/// without start, ...) are logged, counted in [`ReplayReport::dropped`] and
/// skipped. Captured traces are routinely truncated at the start.
pub fn replay<I>(events: I) -> ReplayReport
where
    I: IntoIterator,
    I::Item: Borrow<TraceEvent>,
{
    let mut acc = ReplayAccumulator::new();
    acc.feed(events);
    acc.finish()
}
