//! JSON output format for per-task time attribution
//!
//! Produced by `taskclock replay --format json`. Task order follows task id,
//! so identical traces give byte-identical documents.

use crate::category::TaskTimeRecord;
use crate::replay::ReplayReport;
use crate::time_attribution::{Hotspot, TimeAttribution};
use serde::{Deserialize, Serialize};

/// Time share of one category across all tasks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonAttribution {
    /// Category name (e.g., "exec", "net_wait")
    pub category: String,
    /// Total time in nanoseconds
    pub total_ns: u64,
    /// Tasks with any time in the category
    pub task_count: usize,
    /// Percentage of all attributed time
    pub percentage: f64,
    /// Average nanoseconds per contributing task
    pub avg_per_task_ns: u64,
}

/// A flagged category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonHotspot {
    pub category: String,
    pub percentage: f64,
    pub explanation: String,
    pub is_expected: bool,
}

/// Summary statistics for the trace
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JsonSummary {
    /// Number of tasks reported
    pub total_tasks: u64,
    /// Tasks that ended inside the trace
    pub ended_tasks: u64,
    /// Sum of task lifetimes in nanoseconds
    pub total_time_ns: u64,
    /// Replay only: events applied and dropped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub events_applied: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dropped_events: Option<u64>,
    /// Replay only: timestamp open tasks were finalized at
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_timestamp: Option<u64>,
}

/// Root JSON output structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonOutput {
    /// Format version identifier
    pub version: String,
    /// Format name
    pub format: String,
    /// One record per task
    pub tasks: Vec<TaskTimeRecord>,
    /// Summary statistics
    pub summary: JsonSummary,
    /// Category summary (if --hotspots enabled)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribution: Option<Vec<JsonAttribution>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hotspots: Option<Vec<JsonHotspot>>,
}

impl JsonOutput {
    /// Create a new JSON output structure
    pub fn new() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            format: "taskclock-json-v1".to_string(),
            tasks: Vec::new(),
            summary: JsonSummary::default(),
            attribution: None,
            hotspots: None,
        }
    }

    /// Output holding every record of a finished replay
    pub fn from_report(report: &ReplayReport) -> Self {
        let mut output = Self::new();
        for record in report.records.values() {
            output.add_task(*record);
        }
        output.summary.events_applied = Some(report.events_applied);
        output.summary.dropped_events = Some(report.dropped);
        output.summary.last_timestamp = Some(report.last_timestamp);
        output
    }

    /// Add a task record to the output
    pub fn add_task(&mut self, record: TaskTimeRecord) {
        self.summary.total_tasks += 1;
        if record.is_finalized() {
            self.summary.ended_tasks += 1;
        }
        self.summary.total_time_ns = self.summary.total_time_ns.saturating_add(record.total);
        self.tasks.push(record);
    }

    pub fn set_attribution(&mut self, attributions: &[TimeAttribution]) {
        self.attribution = Some(
            attributions
                .iter()
                .map(|a| JsonAttribution {
                    category: a.category.name().to_string(),
                    total_ns: u64::try_from(a.total_time.as_nanos()).unwrap_or(u64::MAX),
                    task_count: a.task_count,
                    percentage: a.percentage,
                    avg_per_task_ns: u64::try_from(a.avg_per_task.as_nanos()).unwrap_or(u64::MAX),
                })
                .collect(),
        );
    }

    pub fn set_hotspots(&mut self, hotspots: &[Hotspot]) {
        self.hotspots = Some(
            hotspots
                .iter()
                .map(|h| JsonHotspot {
                    category: h.category.name().to_string(),
                    percentage: h.percentage,
                    explanation: h.explanation.clone(),
                    is_expected: h.is_expected,
                })
                .collect(),
        );
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Default for JsonOutput {
    fn default() -> Self {
        Self::new()
    }
}
