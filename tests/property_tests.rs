//! Property-based tests using proptest
//!
//! These tests check the framing invariants over randomly generated packets,
//! chunk boundaries and line noise.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use proptest::prelude::*;
use telemetry_protocol::core::checksum;
use telemetry_protocol::{DataStream, Packet, PacketBuilder, UdpPacket, UdpPacketBuilder, UdpPacketDecoder};

fn build(dest: u16, source: u16, body: &[u8]) -> UdpPacket {
    let mut builder = UdpPacketBuilder::new(dest, source).expect("non-zero destination");
    builder.add(body);
    builder.to_packet().expect("body within limit")
}

/// Random bytes salted with marker fragments, up to a complete marker
fn noise() -> impl Strategy<Value = Vec<u8>> {
    let part = prop_oneof![
        4 => any::<u8>().prop_map(|b| vec![b]),
        1 => Just(b"$".to_vec()),
        1 => Just(b"$U".to_vec()),
        1 => Just(b"$UD".to_vec()),
        1 => Just(b"$UDP".to_vec()),
        1 => Just(b"$UDP$".to_vec()),
    ];
    prop::collection::vec(part, 0..32).prop_map(|parts| parts.concat())
}

// Property: a built packet decodes back to the same header and body
proptest! {
    #[test]
    fn prop_build_decode_roundtrip(
        dest in 1u16..,
        source in any::<u16>(),
        body in prop::collection::vec(any::<u8>(), 0..2048),
    ) {
        let packet = build(dest, source, &body);
        let mut decoder = UdpPacketDecoder::new();
        let overflow = decoder.feed(&packet.to_bytes());

        prop_assert!(overflow.is_empty());
        prop_assert!(decoder.end_of_packet());
        prop_assert!(decoder.packet_is_valid());
        prop_assert_eq!(decoder.to_packet(), Some(packet));
    }
}

// Property: where the stream is split does not change the result
proptest! {
    #[test]
    fn prop_split_point_is_irrelevant(
        body in prop::collection::vec(any::<u8>(), 0..512),
        split in any::<prop::sample::Index>(),
    ) {
        let wire = build(9, 3, &body).to_bytes();
        let at = split.index(wire.len() + 1);

        let mut decoder = UdpPacketDecoder::new();
        let first = decoder.feed(&wire[..at]);
        prop_assert!(first.is_empty());
        if at < wire.len() {
            prop_assert!(!decoder.end_of_packet());
            decoder.feed(&wire[at..]);
        }

        let decoded = decoder.to_packet().expect("valid packet");
        prop_assert_eq!(decoded.body(), &body[..]);
    }
}

// Property: feeding one byte at a time decodes the same packet
proptest! {
    #[test]
    fn prop_byte_at_a_time(body in prop::collection::vec(any::<u8>(), 0..256)) {
        let wire = build(1, 2, &body).to_bytes();
        let mut decoder = UdpPacketDecoder::new();
        for byte in wire.iter() {
            prop_assert!(!decoder.end_of_packet());
            decoder.feed(&[*byte]);
        }

        prop_assert!(decoder.packet_is_valid());
        let packet = decoder.to_packet().expect("packet");
        prop_assert_eq!(packet.body(), &body[..]);
    }
}

// Property: the decoder resynchronizes after noise, including partial and
// complete markers
proptest! {
    #[test]
    fn prop_resync_after_noise(
        prefix in noise(),
        body in prop::collection::vec(any::<u8>(), 0..256),
    ) {
        let mut stream = prefix;
        stream.extend_from_slice(&build(5, 6, &body).to_bytes());

        // false frames started by the noise may be rejected, never the packet
        let batch = UdpPacketDecoder::new().decode(&stream);
        let last = batch.packets.last().expect("packet after noise");
        prop_assert_eq!(last.header().dest_port(), 5);
        prop_assert_eq!(last.header().source_port(), 6);
        prop_assert_eq!(last.body(), &body[..]);
    }
}

// Property: flipping bits in one body byte invalidates the frame
proptest! {
    #[test]
    fn prop_body_corruption_detected(
        body in prop::collection::vec(any::<u8>(), 1..256),
        position in any::<prop::sample::Index>(),
        mask in 1u8..,
    ) {
        let mut wire = build(7, 8, &body).to_bytes().to_vec();
        let body_start = wire.len() - body.len();
        wire[body_start + position.index(body.len())] ^= mask;

        let mut decoder = UdpPacketDecoder::new();
        decoder.feed(&wire);
        prop_assert!(decoder.end_of_packet());
        prop_assert!(!decoder.packet_is_valid());
        prop_assert!(decoder.to_packet().is_none());
    }
}

// Property: back-to-back packets are all recovered through overflow
proptest! {
    #[test]
    fn prop_concatenated_packets(
        bodies in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..128), 1..8),
    ) {
        let mut stream = Vec::new();
        for (i, body) in bodies.iter().enumerate() {
            stream.extend_from_slice(&build(i as u16 + 1, 0, body).to_bytes());
        }

        let batch = UdpPacketDecoder::new().decode(&stream);
        prop_assert_eq!(batch.packets.len(), bodies.len());
        for (i, (packet, body)) in batch.packets.iter().zip(&bodies).enumerate() {
            prop_assert_eq!(packet.header().dest_port(), i as u16 + 1);
            prop_assert_eq!(packet.body(), &body[..]);
        }
    }
}

// Property: the checksum is never zero and always verifies
proptest! {
    #[test]
    fn prop_checksum_never_zero(
        source in any::<u16>(),
        dest in any::<u16>(),
        body in prop::collection::vec(any::<u8>(), 0..512),
    ) {
        let sum = checksum::checksum(source, dest, &body);
        prop_assert_ne!(sum, 0);
        prop_assert!(checksum::verify(source, dest, &body, sum));
    }
}

// Property: DataStream accepts whole multiples and ignores everything else
proptest! {
    #[test]
    fn prop_data_stream_whole_frames_only(
        size in 1usize..16,
        data in prop::collection::vec(any::<u8>(), 0..256),
    ) {
        let mut stream = DataStream::new(size).unwrap();
        stream.write(&data);

        if !data.is_empty() && data.len() % size == 0 {
            prop_assert_eq!(stream.packet_count(), data.len() / size);
            let all = stream.read_many(usize::MAX).expect("frames queued");
            prop_assert_eq!(&all[..], &data[..]);
        } else {
            prop_assert!(stream.is_empty());
        }
    }
}
