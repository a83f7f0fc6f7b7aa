// Category-level attribution across tasks
//
// Objective: show where a workload's task time goes as a whole, not just
// per task. A thousand tasks each waiting a little for a worker can cost
// more than one task stuck on the network.

mod attribution;
mod hotspot;

pub use attribution::{calculate_time_attribution, TimeAttribution};
pub use hotspot::{identify_hotspots, Hotspot, HOTSPOT_THRESHOLD};

#[cfg(test)]
mod tests;
