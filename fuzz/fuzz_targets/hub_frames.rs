// fuzz/fuzz_targets/hub_frames.rs
//! Arbitrary text frames through the hub decoder. Must never panic.
#![no_main]

use jobwatch_live::protocol::{decode_progress, parse_handshake, parse_records};
use jobwatch_live::HubMessage;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(frame) = std::str::from_utf8(data) else {
        return;
    };

    let rest = parse_handshake(frame).unwrap_or(frame);
    for message in parse_records(rest).into_iter().flatten() {
        if let HubMessage::Invocation { target, arguments } = message {
            let _ = decode_progress(&target, &arguments);
        }
    }
});
