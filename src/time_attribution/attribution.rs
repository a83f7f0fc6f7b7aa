// Time attribution per category
//
// Sums each category over all task records. Percentages are relative to all
// attributed time, sweeping included, so they add up to 100.

use crate::category::{TaskTimeRecord, TimeCategory};
use std::fmt;
use std::time::Duration;

/// Time attributed to one category across tasks
#[derive(Debug, Clone, PartialEq)]
pub struct TimeAttribution {
    pub category: TimeCategory,

    /// Total time spent in this category
    pub total_time: Duration,

    /// Number of tasks with any time in this category
    pub task_count: usize,

    /// Percentage of all attributed time
    pub percentage: f64,

    /// Average over the tasks that spent time here
    pub avg_per_task: Duration,
}

impl fmt::Display for TimeAttribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {:.2}% ({} tasks, avg {:?}/task, total {:?})",
            self.category, self.percentage, self.task_count, self.avg_per_task, self.total_time
        )
    }
}

/// Aggregate task records by category
///
/// Categories nobody spent time in are left out.
///
/// # Returns
/// Vector of TimeAttribution sorted by total_time (descending)
///
/// # Example
/// ```
/// use taskclock::category::{TaskTimeRecord, TimeCategory};
/// use taskclock::time_attribution::calculate_time_attribution;
///
/// let mut record = TaskTimeRecord::new(1);
/// record.executing = 3_000;
/// record.net_wait = 1_000;
///
/// let attributions = calculate_time_attribution([&record]);
/// assert_eq!(attributions[0].category, TimeCategory::Executing);
/// assert!((attributions[0].percentage - 75.0).abs() < 1e-9);
/// ```
pub fn calculate_time_attribution<'a, I>(records: I) -> Vec<TimeAttribution>
where
    I: IntoIterator<Item = &'a TaskTimeRecord>,
{
    let mut time = [0u64; TimeCategory::ALL.len()];
    let mut tasks = [0usize; TimeCategory::ALL.len()];

    for record in records {
        for (i, category) in TimeCategory::ALL.iter().enumerate() {
            let nanos = record.bucket(*category);
            if nanos > 0 {
                time[i] = time[i].saturating_add(nanos);
                tasks[i] += 1;
            }
        }
    }

    let total_nanos = time.iter().fold(0u64, |acc, t| acc.saturating_add(*t));
    if total_nanos == 0 {
        return Vec::new(); // Avoid division by zero
    }

    let mut attributions: Vec<TimeAttribution> = TimeCategory::ALL
        .iter()
        .enumerate()
        .filter(|(i, _)| tasks[*i] > 0)
        .map(|(i, category)| TimeAttribution {
            category: *category,
            total_time: Duration::from_nanos(time[i]),
            task_count: tasks[i],
            percentage: (time[i] as f64 / total_nanos as f64) * 100.0,
            avg_per_task: Duration::from_nanos(time[i] / tasks[i] as u64),
        })
        .collect();

    // Stable: ties keep category order
    attributions.sort_by(|a, b| b.total_time.cmp(&a.total_time));

    attributions
}
