#![no_main]

use failchain_diagnostics::{Delimiters, Failure, collect_data, format_messages};
use libfuzzer_sys::fuzz_target;

// Levels are separated by '|', kind and message by '='.
fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    let mut levels = text.split('|').take(64).collect::<Vec<_>>();
    levels.reverse();

    let mut chain: Option<Failure> = None;
    for level in levels {
        let (kind, message) = level.split_once('=').unwrap_or((level, ""));
        let node = Failure::new(kind.to_owned(), message.to_owned());
        chain = Some(match chain.take() {
            Some(cause) => node.with_cause(cause),
            None => node,
        });
    }
    let Some(chain) = chain else { return };

    let delimiters = Delimiters::new(Some(" / "), Some(","));
    let first = format_messages(&chain, &delimiters).unwrap();
    assert_eq!(first, format_messages(&chain, &delimiters).unwrap());
    assert!(!first.contains('\n'));

    let collected = collect_data(&chain).unwrap();
    assert!(!collected.ends_with("::"));
});
