// Typed trace events and their JSON Lines encoding

use super::demux::WorkerId;
use crate::category::{BlockReason, TaskId};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

/// One scheduler event as captured in a trace
///
/// Serialized flat, with the kind as a tag:
/// `{"worker":0,"ts":100,"kind":"block","reason":"recv"}`.
/// A missing or `null` worker means [`WorkerId::Global`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "fuzz", derive(arbitrary::Arbitrary))]
pub struct TraceEvent {
    #[serde(default)]
    pub worker: WorkerId,
    pub ts: u64,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl TraceEvent {
    pub fn new(worker: WorkerId, ts: u64, kind: EventKind) -> Self {
        Self { worker, ts, kind }
    }

    /// Event recorded on local worker `worker`
    pub fn local(worker: u32, ts: u64, kind: EventKind) -> Self {
        Self::new(WorkerId::Local(worker), ts, kind)
    }

    /// Event not attributed to a worker
    pub fn global(ts: u64, kind: EventKind) -> Self {
        Self::new(WorkerId::Global, ts, kind)
    }
}

/// What happened
///
/// Events carrying a `task` name their target explicitly; the others act on
/// the task last started on the recording worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "fuzz", derive(arbitrary::Arbitrary))]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventKind {
    /// Worker switches scheduling context to `next`
    Batch { next: WorkerId },
    Create { task: TaskId },
    Start { task: TaskId },
    End,
    Stop,
    Block { reason: BlockReason },
    /// Voluntary yield
    Sched,
    Preempt,
    Unblock { task: TaskId },
    SyscallEnter,
    SyscallExit { task: TaskId },
    SweepStart,
    SweepDone,
    GcStart,
    GcDone,
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::Batch { .. } => "batch",
            EventKind::Create { .. } => "create",
            EventKind::Start { .. } => "start",
            EventKind::End => "end",
            EventKind::Stop => "stop",
            EventKind::Block { reason } => reason.name(),
            EventKind::Sched => "sched",
            EventKind::Preempt => "preempt",
            EventKind::Unblock { .. } => "unblock",
            EventKind::SyscallEnter => "syscall_enter",
            EventKind::SyscallExit { .. } => "syscall_exit",
            EventKind::SweepStart => "sweep_start",
            EventKind::SweepDone => "sweep_done",
            EventKind::GcStart => "gc_start",
            EventKind::GcDone => "gc_done",
        }
    }

    /// Task named explicitly by the event, if any
    pub fn target(&self) -> Option<TaskId> {
        match self {
            EventKind::Create { task }
            | EventKind::Start { task }
            | EventKind::Unblock { task }
            | EventKind::SyscallExit { task } => Some(*task),
            _ => None,
        }
    }
}

/// Stable merge of per-worker streams into replay order
///
/// Events with equal timestamps keep their relative order, so each
/// worker's own sequence survives as long as it was monotonic.
pub fn sort_for_replay(events: &mut [TraceEvent]) {
    events.sort_by_key(|event| event.ts);
}

/// Parse a JSON Lines trace; blank lines are skipped
pub fn parse_jsonl<R: BufRead>(reader: R) -> Result<Vec<TraceEvent>> {
    let mut events = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read line {}", index + 1))?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let event: TraceEvent = serde_json::from_str(line)
            .with_context(|| format!("Invalid event on line {}", index + 1))?;
        events.push(event);
    }
    Ok(events)
}

/// Load a JSON Lines trace from disk
pub fn read_jsonl_file(path: &Path) -> Result<Vec<TraceEvent>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open trace file: {}", path.display()))?;
    parse_jsonl(BufReader::new(file))
        .with_context(|| format!("Failed to parse trace file: {}", path.display()))
}

/// Write one JSON object per line
pub fn write_jsonl<W: Write>(mut writer: W, events: &[TraceEvent]) -> Result<()> {
    for event in events {
        serde_json::to_writer(&mut writer, event).context("Failed to serialize event")?;
        writer.write_all(b"\n").context("Failed to write event")?;
    }
    writer.flush().context("Failed to flush trace")?;
    Ok(())
}
