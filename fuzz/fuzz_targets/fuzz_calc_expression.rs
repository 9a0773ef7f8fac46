#![no_main]

use fluid_engine::expr::{evaluate, is_safe};
use fluid_engine::ComputeError;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if text.len() > 1024 {
        return;
    }

    // evaluate must never panic.
    let result = evaluate(text);

    // Anything outside the arithmetic set is rejected before parsing.
    if !is_safe(text) {
        assert!(
            matches!(result, Err(ComputeError::UnsafeExpression { .. })),
            "unsafe input accepted: {text:?}"
        );
    }

    // Successful results are finite.
    if let Ok(value) = result {
        assert!(value.is_finite());
    }
});
