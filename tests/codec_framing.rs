//! Framing datagrams over async byte streams with `UdpCodec`

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::io;

use bytes::Bytes;
use futures::{stream, SinkExt, StreamExt};
use telemetry_protocol::{Packet, UdpCodec, UdpPacket};
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::io::StreamReader;

fn packets() -> Vec<UdpPacket> {
    (1..=5u16)
        .map(|port| {
            let body = vec![port as u8; port as usize * 10];
            UdpPacket::with_ports(port, 100, body).unwrap()
        })
        .collect()
}

async fn encode_all(packets: &[UdpPacket]) -> Vec<u8> {
    let mut sink = FramedWrite::new(Vec::new(), UdpCodec::default());
    for packet in packets {
        sink.send(packet.clone()).await.unwrap();
    }
    sink.into_inner()
}

#[tokio::test]
async fn test_framed_roundtrip() {
    let sent = packets();
    let wire = encode_all(&sent).await;

    let received: Vec<UdpPacket> = FramedRead::new(&wire[..], UdpCodec::default())
        .map(|item| item.unwrap())
        .collect()
        .await;

    assert_eq!(received, sent);
}

#[tokio::test]
async fn test_framed_read_with_tiny_chunks() {
    let sent = packets();
    let wire = encode_all(&sent).await;

    // three bytes per read, so markers and headers straddle reads
    let chunks: Vec<io::Result<Bytes>> = wire
        .chunks(3)
        .map(|chunk| Ok(Bytes::copy_from_slice(chunk)))
        .collect();
    let reader = StreamReader::new(stream::iter(chunks));

    let mut framed = FramedRead::new(reader, UdpCodec::default());
    for expected in &sent {
        let packet = framed.next().await.expect("packet").unwrap();
        assert_eq!(packet.header().dest_port(), expected.header().dest_port());
        assert_eq!(packet.body(), expected.body());
    }
    assert!(framed.next().await.is_none());
}

#[tokio::test]
async fn test_framed_read_skips_noise_and_corruption() {
    let sent = packets();
    let mut wire = b"noise before the first frame".to_vec();
    wire.extend_from_slice(&encode_all(&sent[..2]).await);

    let mut corrupted = sent[2].to_bytes().to_vec();
    let last = corrupted.len() - 1;
    corrupted[last] ^= 0xFF;
    wire.extend_from_slice(&corrupted);
    wire.extend_from_slice(&encode_all(&sent[3..]).await);

    let mut framed = FramedRead::new(&wire[..], UdpCodec::default());
    let mut ports = Vec::new();
    while let Some(item) = framed.next().await {
        ports.push(item.unwrap().header().dest_port());
    }

    assert_eq!(ports, vec![1, 2, 4, 5]);
    assert_eq!(framed.decoder().rejected(), 1);
}
