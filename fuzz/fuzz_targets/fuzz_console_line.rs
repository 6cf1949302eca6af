//! Fuzz target: console request parser
//!
//! cargo fuzz run fuzz_console_line

#![no_main]

use greenhouse::adapters::console::{parse_line, ConsoleRequest};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    if let Ok(ConsoleRequest::Profile(profile)) = parse_line(&text) {
        assert!(!profile.crop_id.is_empty());
    }
});
