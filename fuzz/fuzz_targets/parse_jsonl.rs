#![no_main]

use libfuzzer_sys::fuzz_target;
use taskclock::replay::{parse_jsonl, replay};

fuzz_target!(|data: &[u8]| {
    // Malformed input must come back as an error, not a panic
    if let Ok(events) = parse_jsonl(data) {
        let _ = replay(&events);
    }
});
