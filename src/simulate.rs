// Synthetic multi-worker workload
//
// Produces a replayable trace shaped like a small service: tasks compute,
// sleep, write files (blocking syscalls), fetch over the network and hand
// values over channels. Each worker runs its queue of tasks one at a time;
// wake-ups may come from any worker, and collections are global.

use crate::category::BlockReason;
use crate::config::MAX_WORKERS;
use crate::replay::{sort_for_replay, EventKind, TraceEvent};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::ops::Range;

const COMPUTE_NS: Range<u64> = 50_000..2_000_000;
const SLEEP_NS: Range<u64> = 100_000..1_000_000;
const WRITE_NS: Range<u64> = 200_000..800_000;
const FETCH_NS: Range<u64> = 1_000_000..5_000_000;
const HANDOFF_NS: Range<u64> = 100_000..1_000_000;
const RESCHEDULE_NS: Range<u64> = 1_000..200_000;
const SWEEP_NS: Range<u64> = 5_000..50_000;
const GC_PAUSE_NS: Range<u64> = 100_000..1_500_000;

/// Largest accepted spacing between collections
pub const MAX_GC_INTERVAL_NS: u64 = u64::MAX / 4;

/// Parameters of a synthetic run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationConfig {
    pub tasks: usize,
    pub workers: u32,
    pub seed: u64,
    /// Mean spacing between collections; 0 disables them
    pub gc_interval_ns: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tasks: 8,
            workers: 2,
            seed: 42,
            gc_interval_ns: 5_000_000,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.tasks == 0 {
            return Err("tasks must be at least 1".to_string());
        }
        if self.workers == 0 || self.workers as usize > MAX_WORKERS {
            return Err(format!("workers must be between 1 and {}", MAX_WORKERS));
        }
        if self.gc_interval_ns > MAX_GC_INTERVAL_NS {
            return Err(format!(
                "gc interval must be <= {}, got {}",
                MAX_GC_INTERVAL_NS, self.gc_interval_ns
            ));
        }
        Ok(())
    }
}

/// One step of a task's body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Compute,
    Sleep,
    WriteFile,
    Fetch,
    ChannelHandoff,
}

const BLOCKING_PHASES: [Phase; 4] = [
    Phase::Sleep,
    Phase::WriteFile,
    Phase::Fetch,
    Phase::ChannelHandoff,
];

struct Simulator {
    rng: StdRng,
    workers: u32,
    events: Vec<TraceEvent>,
}

impl Simulator {
    fn emit(&mut self, worker: u32, ts: u64, kind: EventKind) {
        self.events.push(TraceEvent::local(worker, ts, kind));
    }

    fn waker(&mut self) -> u32 {
        self.rng.gen_range(0..self.workers)
    }

    /// Run `task` on `worker` from `now`; returns when it ended
    fn run_task(&mut self, worker: u32, task: u64, mut now: u64) -> u64 {
        let mut body = vec![Phase::Compute];
        for _ in 0..self.rng.gen_range(1..=4) {
            if let Some(phase) = BLOCKING_PHASES.choose(&mut self.rng) {
                body.push(*phase);
            }
            body.push(Phase::Compute);
        }

        self.emit(worker, now, EventKind::Start { task });
        for phase in body {
            now = self.run_phase(worker, task, phase, now);
        }
        self.emit(worker, now, EventKind::End);
        now
    }

    fn run_phase(&mut self, worker: u32, task: u64, phase: Phase, now: u64) -> u64 {
        let (block, wait) = match phase {
            Phase::Compute => return self.compute(worker, now),
            Phase::Sleep => (EventKind::Block { reason: BlockReason::Sleep }, SLEEP_NS),
            Phase::Fetch => (EventKind::Block { reason: BlockReason::Net }, FETCH_NS),
            Phase::ChannelHandoff => (EventKind::Block { reason: BlockReason::Send }, HANDOFF_NS),
            Phase::WriteFile => (EventKind::SyscallEnter, WRITE_NS),
        };

        self.emit(worker, now, block);
        let woken = now + self.rng.gen_range(wait);
        let waker = self.waker();
        let wake = if phase == Phase::WriteFile {
            EventKind::SyscallExit { task }
        } else {
            EventKind::Unblock { task }
        };
        self.emit(waker, woken, wake);

        let resumed = woken + self.rng.gen_range(RESCHEDULE_NS);
        self.emit(worker, resumed, EventKind::Start { task });
        resumed
    }

    fn compute(&mut self, worker: u32, now: u64) -> u64 {
        let end = now + self.rng.gen_range(COMPUTE_NS);
        // Allocation-heavy stretches occasionally help the sweeper
        if self.rng.gen_bool(0.25) {
            let sweep = now + 1;
            let span = self.rng.gen_range(SWEEP_NS).min(end - sweep);
            self.emit(worker, sweep, EventKind::SweepStart);
            self.emit(worker, sweep + span, EventKind::SweepDone);
        }
        end
    }

    fn collections(&mut self, interval: u64, horizon: u64) {
        let mut now: u64 = 0;
        loop {
            let spacing = self
                .rng
                .gen_range(interval / 2..=interval.saturating_add(interval / 2));
            now = now.saturating_add(spacing);
            if now >= horizon {
                break;
            }
            let done = now.saturating_add(self.rng.gen_range(GC_PAUSE_NS));
            self.events.push(TraceEvent::global(now, EventKind::GcStart));
            self.events.push(TraceEvent::global(done, EventKind::GcDone));
            now = done;
        }
    }
}

/// Generate a trace in replay order
///
/// Identical configurations yield identical traces.
///
/// # Example
/// ```
/// use taskclock::replay::replay;
/// use taskclock::simulate::{simulate, SimulationConfig};
///
/// let config = SimulationConfig { tasks: 4, ..SimulationConfig::default() };
/// let report = replay(&simulate(&config));
/// assert_eq!(report.len(), 4);
/// assert_eq!(report.dropped, 0);
/// ```
pub fn simulate(config: &SimulationConfig) -> Vec<TraceEvent> {
    let workers = config.workers.max(1);
    let mut sim = Simulator {
        rng: StdRng::seed_from_u64(config.seed),
        workers,
        events: Vec::new(),
    };

    // Tasks are spawned up front and queue on their worker
    let mut queues: Vec<Vec<u64>> = vec![Vec::new(); workers as usize];
    for task in 1..=config.tasks as u64 {
        let worker = sim.rng.gen_range(0..workers);
        sim.emit(worker, 0, EventKind::Create { task });
        queues[worker as usize].push(task);
    }

    let mut horizon = 0;
    for (worker, queue) in queues.into_iter().enumerate() {
        let worker = worker as u32;
        let mut now = 0;
        for task in queue {
            now += sim.rng.gen_range(RESCHEDULE_NS);
            now = sim.run_task(worker, task, now);
        }
        horizon = horizon.max(now);
    }

    if config.gc_interval_ns > 0 {
        sim.collections(config.gc_interval_ns, horizon);
    }

    tracing::debug!(
        tasks = config.tasks,
        workers,
        events = sim.events.len(),
        horizon,
        "simulated workload"
    );

    let mut events = sim.events;
    sort_for_replay(&mut events);
    events
}
