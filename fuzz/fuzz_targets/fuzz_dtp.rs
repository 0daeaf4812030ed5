#![no_main]

use libfuzzer_sys::fuzz_target;
use telemetry_protocol::DtpPacket;

fuzz_target!(|data: &[u8]| {
    let _ = DtpPacket::from_bytes(data);
});
