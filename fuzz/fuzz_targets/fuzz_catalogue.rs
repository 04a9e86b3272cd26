//! Fuzz target for catalogue parsing and validation.
//!
//! Arbitrary bytes must either fail to parse, fail validation, or produce a
//! registry whose composites only reference atomic types.

#![no_main]

use ft_config::{CatalogueFile, Registry};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(catalogue) = CatalogueFile::from_json_str(text) else {
        return;
    };
    let Ok(registry) = Registry::from_catalogue(&catalogue) else {
        return;
    };

    for ty in registry.iter() {
        let sources = ty.sources();
        assert!(sources.windows(2).all(|w| w[0].priority < w[1].priority));
        for source in sources {
            let resolved = registry
                .lookup(source.source_type_id)
                .expect("validated source must exist");
            assert!(resolved.is_atomic());
        }
    }
});
