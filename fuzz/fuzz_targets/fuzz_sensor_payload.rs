//! Fuzz target: device sensor payload parser
//!
//! Feeds arbitrary bytes to `parse_payload` and checks:
//! - No panics on any input
//! - Parsing is deterministic for accepted payloads
//!
//! cargo fuzz run fuzz_sensor_payload

#![no_main]

use chrono::FixedOffset;
use greenhouse::adapters::sensor_feed::parse_payload;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Some(kst) = FixedOffset::east_opt(9 * 3600) else {
        return;
    };
    if let Ok(reading) = parse_payload(text, kst) {
        assert_eq!(parse_payload(text, kst).ok(), Some(reading));
    }
});
