#![no_main]

use failchain_diagnostics::{Failure, MAX_SUFFIX_PROBES};
use libfuzzer_sys::fuzz_target;

// Each byte picks one of a few keys; the count per key is bounded by probing.
fuzz_target!(|data: &[u8]| {
    const KEYS: [&str; 4] = ["Path", "Path-1", "Operation", "X"];

    let mut failure = Failure::new("Kind", "fuzz");
    for (i, byte) in data.iter().enumerate() {
        failure.annotate(KEYS[usize::from(*byte) % KEYS.len()], i);
    }

    assert!(failure.annotations().len() <= KEYS.len() * (MAX_SUFFIX_PROBES + 1));
    assert!(failure.annotations().len() <= data.len());
    let _ = failure.collect_data().unwrap();
});
