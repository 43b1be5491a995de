#![no_main]

use failchain_diagnostics::{DiagnosticReport, DiagnosticSink, Failure, RingBufferSink};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data).into_owned();
    let (kind, rest) = text.split_at(text.char_indices().nth(16).map_or(text.len(), |(i, _)| i));

    let failure = Failure::new(kind.to_owned(), rest.to_owned())
        .with_annotation("Raw", data.to_vec())
        .wrap("IoFailure", rest.to_owned());

    let report = DiagnosticReport::new(&failure).unwrap();
    let mut line = String::new();
    report.write_to(&mut line).unwrap();

    let sink = RingBufferSink::new(2, 256);
    sink.record(&report);
    assert!(sink.payload_bytes() <= 256);
});
