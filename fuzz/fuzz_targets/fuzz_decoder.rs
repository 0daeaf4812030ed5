#![no_main]

use libfuzzer_sys::fuzz_target;
use telemetry_protocol::UdpPacketDecoder;

fuzz_target!(|data: &[u8]| {
    // Fuzz stream decoding - test for panics, crashes, infinite loops
    let mut decoder = UdpPacketDecoder::new();
    let split = data.first().map_or(0, |b| *b as usize).min(data.len());
    let _ = decoder.decode(&data[..split]);
    let _ = decoder.decode(&data[split..]);
    while decoder.try_read_char().is_some() {}
    while decoder.try_read_u8().is_some() {}
});
