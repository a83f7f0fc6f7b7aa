#![no_main]

use libfuzzer_sys::fuzz_target;
use taskclock::replay::{replay, sort_for_replay, TraceEvent};

fuzz_target!(|events: Vec<TraceEvent>| {
    let mut events = events;
    sort_for_replay(&mut events);

    // Replay never panics; every event is either applied or dropped
    let report = replay(&events);
    assert_eq!(report.events_applied + report.dropped, events.len() as u64);
    for record in report.records.values() {
        assert!(record.is_finalized());
    }
});
