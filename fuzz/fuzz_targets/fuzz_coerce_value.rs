//! Fuzz target for raw reading value coercion.
//!
//! Any accepted payload must coerce to a finite float.

#![no_main]

use ft_common::coerce_value;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(raw) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };
    if let Ok(value) = coerce_value(&raw) {
        assert!(value.is_finite());
    }
});
