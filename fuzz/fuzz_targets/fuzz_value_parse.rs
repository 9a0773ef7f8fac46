#![no_main]

use fluid_parse::{format_value, parse_value};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if text.len() > 4096 {
        return;
    }

    // parse_value must never panic.
    let value = parse_value(text);

    // No produced group is empty.
    for group in &value {
        assert!(!group.is_empty(), "empty group for {text:?}");
    }

    // Rendering must never panic either.
    let _ = format_value(&value);
});
