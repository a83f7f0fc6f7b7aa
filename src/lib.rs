//! taskclock - per-task time attribution for cooperative schedulers
//!
//! Splits each task's wall-clock lifetime into executing, waiting for a
//! worker, blocked (sync, network, syscall, collection) and sweeping time.
//! Two accumulators share one category model: a live accumulator driven by
//! scheduler callbacks while tasks run, and a replay accumulator that folds a
//! captured, time-ordered event log after the fact.

pub mod category;
pub mod cli;
pub mod clock;
pub mod config;
pub mod error;
pub mod json_output;
pub mod live;
pub mod replay;
pub mod simulate;
pub mod time_attribution;
