#![no_main]

use hotscope::trace_protocol::{self, TraceEvent};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Trace lines arrive from untrusted child stderr and are decoded lossily
    let line = String::from_utf8_lossy(data);

    // Must never panic; well-formed calls must survive re-encoding
    if let Some(Ok(TraceEvent::Call(identity))) = trace_protocol::parse_line(&line) {
        let encoded = trace_protocol::format_call(&identity);
        if let Some(Ok(TraceEvent::Call(again))) = trace_protocol::parse_line(&encoded) {
            assert_eq!(again, identity);
        }
    }
});
