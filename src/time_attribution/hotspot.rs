// Hotspot identification for time attribution analysis
//
// Flags categories that consume more than 5% of attributed task time
// and explains what each one usually means for a cooperative scheduler.

use crate::category::TimeCategory;
use crate::time_attribution::attribution::TimeAttribution;
use std::time::Duration;

/// Share of attributed time above which a category is reported
pub const HOTSPOT_THRESHOLD: f64 = 5.0;

/// A category where the workload spends a notable share of its time
#[derive(Debug, Clone, PartialEq)]
pub struct Hotspot {
    pub category: TimeCategory,

    /// Total time spent in this hotspot
    pub time: Duration,

    /// Percentage of all attributed time
    pub percentage: f64,

    /// Human-readable explanation
    pub explanation: String,

    /// Whether this is a normal cost of doing work
    pub is_expected: bool,
}

impl Hotspot {
    /// Format as human-readable report
    pub fn to_report_string(&self) -> String {
        let expected_marker = if self.is_expected { "✓" } else { "⚠️" };
        format!(
            "{} {} ({:.1}%, {:?})\n   {}",
            expected_marker, self.category, self.percentage, self.time, self.explanation
        )
    }
}

/// Identify hotspots from time attributions
///
/// # Returns
/// Hotspots in the order of `attributions` (already sorted by time)
///
/// # Example
/// ```
/// use taskclock::category::{TaskTimeRecord, TimeCategory};
/// use taskclock::time_attribution::{calculate_time_attribution, identify_hotspots};
///
/// let mut record = TaskTimeRecord::new(1);
/// record.executing = 1_000;
/// record.sched_wait = 9_000;
///
/// let hotspots = identify_hotspots(&calculate_time_attribution([&record]));
/// assert_eq!(hotspots[0].category, TimeCategory::SchedWait);
/// assert!(!hotspots[0].is_expected);
/// ```
pub fn identify_hotspots(attributions: &[TimeAttribution]) -> Vec<Hotspot> {
    attributions
        .iter()
        .filter(|a| a.percentage > HOTSPOT_THRESHOLD)
        .map(|a| Hotspot {
            category: a.category,
            time: a.total_time,
            percentage: a.percentage,
            explanation: explain_hotspot(a.category, a.percentage),
            is_expected: is_expected_cost(a.category, a.percentage),
        })
        .collect()
}

/// Generate explanation for a hotspot
fn explain_hotspot(category: TimeCategory, percentage: f64) -> String {
    match category {
        TimeCategory::Executing => {
            if percentage > 50.0 {
                format!(
                    "Tasks are running most of the time ({:.1}%). The workload is CPU bound.",
                    percentage
                )
            } else {
                format!("Tasks run for {:.1}% of their lifetime.", percentage)
            }
        }
        TimeCategory::SchedWait => {
            if percentage > 20.0 {
                format!(
                    "Runnable tasks wait {:.1}% of the time for a worker. Workers are saturated; add workers or reduce runnable tasks.",
                    percentage
                )
            } else {
                format!(
                    "Scheduler wait is {:.1}% of time. Normal queueing between runs.",
                    percentage
                )
            }
        }
        TimeCategory::SyncBlock => {
            format!(
                "Tasks are blocked on channels or locks {:.1}% of the time. Check for contention or unbuffered hand-offs.",
                percentage
            )
        }
        TimeCategory::NetWait => {
            format!(
                "Network waits take {:.1}% of time. Expected for I/O bound tasks.",
                percentage
            )
        }
        TimeCategory::SyscallBlock => {
            format!(
                "Blocking system calls take {:.1}% of time. Typical for file I/O.",
                percentage
            )
        }
        TimeCategory::GcBlock => {
            format!(
                "Collection pauses overlap {:.1}% of task time. Reduce allocation rate or heap size.",
                percentage
            )
        }
        TimeCategory::Sweeping => {
            format!(
                "Tasks spend {:.1}% of time assisting the sweeper. Allocation-heavy tasks pay for reclamation.",
                percentage
            )
        }
    }
}

/// Check if time in `category` is a normal cost of doing work
fn is_expected_cost(category: TimeCategory, percentage: f64) -> bool {
    match category {
        TimeCategory::Executing | TimeCategory::NetWait | TimeCategory::SyscallBlock => true,
        TimeCategory::SchedWait => percentage <= 20.0,
        TimeCategory::SyncBlock | TimeCategory::GcBlock | TimeCategory::Sweeping => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_attribution(category: TimeCategory, percentage: f64) -> TimeAttribution {
        TimeAttribution {
            category,
            total_time: Duration::from_secs(1),
            task_count: 100,
            percentage,
            avg_per_task: Duration::from_millis(10),
        }
    }

    #[test]
    fn test_identify_hotspots_threshold() {
        let attributions = vec![
            make_attribution(TimeCategory::Executing, 60.0),
            make_attribution(TimeCategory::NetWait, 30.0),
            make_attribution(TimeCategory::SchedWait, 3.0),
        ];

        let hotspots = identify_hotspots(&attributions);

        assert_eq!(hotspots.len(), 2);
        assert_eq!(hotspots[0].category, TimeCategory::Executing);
        assert_eq!(hotspots[1].category, TimeCategory::NetWait);
    }

    #[test]
    fn test_is_expected_cost() {
        assert!(is_expected_cost(TimeCategory::Executing, 90.0));
        assert!(is_expected_cost(TimeCategory::SyscallBlock, 40.0));
        assert!(is_expected_cost(TimeCategory::SchedWait, 10.0));
        assert!(!is_expected_cost(TimeCategory::SchedWait, 35.0));
        assert!(!is_expected_cost(TimeCategory::GcBlock, 6.0));
        assert!(!is_expected_cost(TimeCategory::SyncBlock, 6.0));
    }

    #[test]
    fn test_explain_cpu_bound() {
        let explanation = explain_hotspot(TimeCategory::Executing, 70.0);
        assert!(explanation.contains("CPU bound"));
        assert!(explanation.contains("70.0%"));
    }

    #[test]
    fn test_explain_sched_wait_saturation() {
        assert!(explain_hotspot(TimeCategory::SchedWait, 40.0).contains("saturated"));
        assert!(explain_hotspot(TimeCategory::SchedWait, 10.0).contains("Normal"));
    }

    #[test]
    fn test_explain_gc() {
        let explanation = explain_hotspot(TimeCategory::GcBlock, 12.0);
        assert!(explanation.contains("Collection"));
        assert!(explanation.contains("12.0%"));
    }

    #[test]
    fn test_hotspot_report_string() {
        let hotspot = Hotspot {
            category: TimeCategory::NetWait,
            time: Duration::from_secs(1),
            percentage: 60.0,
            explanation: "Test explanation".to_string(),
            is_expected: true,
        };

        let report = hotspot.to_report_string();
        assert!(report.contains("net_wait"));
        assert!(report.contains("60.0%"));
        assert!(report.contains("✓"));
    }

    #[test]
    fn test_hotspot_unexpected_marker() {
        let hotspot = Hotspot {
            category: TimeCategory::SyncBlock,
            time: Duration::from_millis(100),
            percentage: 10.0,
            explanation: "Contention".to_string(),
            is_expected: false,
        };

        assert!(hotspot.to_report_string().contains("⚠️"));
    }

    #[test]
    fn test_identify_hotspots_all_below_threshold() {
        let attributions = vec![
            make_attribution(TimeCategory::Executing, 2.0),
            make_attribution(TimeCategory::GcBlock, 5.0),
        ];
        assert!(identify_hotspots(&attributions).is_empty());
    }
}
