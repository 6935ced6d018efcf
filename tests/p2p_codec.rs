//! Integration tests for the P2P binary message formats

#![allow(clippy::unwrap_used, clippy::expect_used)]

use bytes::BytesMut;
use msnp_wire::config::P2pConfig;
use msnp_wire::error::ProtocolError;
use msnp_wire::p2p::flags;
use msnp_wire::p2p::wire::{FOOTER_SIZE, HEADER_SIZE, LENGTH_PREFIX_SIZE};
use msnp_wire::p2p::DataChunker;
use msnp_wire::{DirectCodec, HostOrder, P2pMessage};
use std::io::Cursor;
use tokio_util::codec::{Decoder, Encoder};

const SLP_INVITE: &[u8] = b"INVITE MSNMSGR:bob@example.com MSNSLP/1.0\r\n\
To: <msnmsgr:bob@example.com>\r\n\
From: <msnmsgr:alice@example.com>\r\n\
Content-Length: 0\r\n\r\n\0";

#[test]
fn test_standard_encoding_matches_reference_bytes() {
    let mut msg = P2pMessage::new();
    msg.header.session_id = 1;
    msg.header.identifier = 0x0203_0405;
    msg.header.offset = 6;
    msg.header.total_size = 0x0708;
    msg.header.flags = flags::MSN_OBJECT;
    msg.header.ack1 = 0x0A;
    msg.header.ack2 = 0x0B;
    msg.header.ack_total = 0x0C;
    msg.footer = 0x0D;
    msg.set_inner_body(vec![0xEE, 0xFF]);

    let bytes = msg.encode();
    let parts: [&[u8]; 11] = [
        &[0x01, 0, 0, 0],                 // session id
        &[0x05, 0x04, 0x03, 0x02],        // identifier
        &[6, 0, 0, 0, 0, 0, 0, 0],        // offset
        &[0x08, 0x07, 0, 0, 0, 0, 0, 0],  // total size
        &[2, 0, 0, 0],                    // message size
        &[0x20, 0, 0, 0],                 // flags
        &[0x0A, 0, 0, 0],                 // ack1
        &[0x0B, 0, 0, 0],                 // ack2
        &[0x0C, 0, 0, 0, 0, 0, 0, 0],     // ack total
        &[0xEE, 0xFF],                    // body
        &[0x0D, 0, 0, 0],                 // footer
    ];
    let expected = parts.concat();
    assert_eq!(bytes, expected);
}

#[test]
fn test_encoded_length_is_header_body_footer() {
    for len in [0usize, 1, 47, 48, 1202, 4096] {
        let mut msg = P2pMessage::new();
        msg.set_inner_body(vec![0x5A; len]);
        assert_eq!(msg.encode().len(), HEADER_SIZE + len + FOOTER_SIZE);
        assert_eq!(msg.message_size() as usize, len);
    }
}

#[test]
fn test_decode_restores_every_field() {
    let mut msg = P2pMessage::new();
    msg.header.session_id = 0xFFFF_FFFF;
    msg.header.identifier = 91_234;
    msg.header.offset = u64::MAX - 1;
    msg.header.total_size = 1 << 40;
    msg.header.flags = flags::WAITING_REPLY;
    msg.header.ack1 = 17;
    msg.header.ack2 = 18;
    msg.header.ack_total = 19;
    msg.footer = 3;
    msg.set_inner_body(SLP_INVITE.to_vec());

    let bytes = msg.encode();
    let decoded = P2pMessage::decode(&bytes).unwrap();
    assert_eq!(decoded.header, msg.header);
    assert_eq!(decoded.footer, 3);
    assert_eq!(&decoded.inner_body().unwrap()[..], SLP_INVITE);
    assert!(decoded.inner_message().is_none());
}

#[test]
fn test_trailing_bytes_after_footer_are_ignored() {
    let mut msg = P2pMessage::new();
    msg.set_inner_body(b"abc".to_vec());
    let mut bytes = msg.encode();
    bytes.extend_from_slice(b"garbage");

    let decoded = P2pMessage::decode(&bytes).unwrap();
    assert_eq!(&decoded.inner_body().unwrap()[..], b"abc");
    assert_eq!(decoded.footer, 0);
}

#[test]
fn test_truncated_standard_message_is_malformed() {
    let mut msg = P2pMessage::new();
    msg.set_inner_body(vec![1u8; 10]);
    let bytes = msg.encode();

    for cut in [0, 1, HEADER_SIZE, HEADER_SIZE + 10, bytes.len() - 1] {
        let result = P2pMessage::decode(&bytes[..cut]);
        assert!(
            matches!(result, Err(ProtocolError::MalformedMessage { .. })),
            "cut at {cut} should be malformed"
        );
    }
}

#[test]
fn test_declared_size_beyond_input_is_malformed() {
    let mut bytes = P2pMessage::new().encode();
    bytes[24..28].copy_from_slice(&u32::MAX.to_le_bytes());
    assert!(matches!(
        P2pMessage::decode(&bytes),
        Err(ProtocolError::MalformedMessage { .. })
    ));
}

#[test]
fn test_acknowledgement_roundtrip() {
    let mut invite = P2pMessage::new();
    invite.header.identifier = 0x0100_0000;
    invite.header.ack1 = 0x00AB_CDEF;
    invite.set_inner_body(SLP_INVITE.to_vec());
    let received = P2pMessage::decode(&invite.encode()).unwrap();

    let mut ack = received.create_acknowledgement();
    let decoded = P2pMessage::decode(&ack.encode()).unwrap();
    assert!(decoded.is_acknowledgement());
    assert_eq!(decoded.header.ack1, 0x0100_0000);
    assert_eq!(decoded.header.ack2, 0x00AB_CDEF);
    assert_eq!(decoded.header.ack_total, SLP_INVITE.len() as u64);
    assert_eq!(decoded.header.total_size, SLP_INVITE.len() as u64);
    assert_eq!(decoded.message_size(), 0);
}

#[test]
fn test_waiting_reply_ack_keeps_flag() {
    let mut msg = P2pMessage::new();
    msg.header.flags = flags::WAITING_REPLY;
    let ack = msg.create_acknowledgement();
    assert!(flags::contains(ack.header.flags, flags::ACKNOWLEDGEMENT));
    assert!(flags::contains(ack.header.flags, flags::WAITING_REPLY));
}

#[test]
fn test_big_endian_host_interoperates() {
    let mut msg = P2pMessage::data_message();
    msg.header.session_id = 0xA1B2_C3D4;
    msg.header.offset = 0x0000_0001_0000_0002;
    msg.set_inner_body(vec![1, 2, 3]);

    let from_big = msg.encode_with(HostOrder::Big);
    assert_eq!(&from_big[0..4], &[0xD4, 0xC3, 0xB2, 0xA1]);

    let on_little = P2pMessage::decode_with(&from_big, HostOrder::Little).unwrap();
    assert_eq!(on_little.header.session_id, 0xA1B2_C3D4);
    assert_eq!(on_little.header.offset, 0x0000_0001_0000_0002);
    assert_eq!(on_little.footer, 1);
}

#[test]
fn test_direct_codec_stream_of_messages() {
    let mut codec = DirectCodec::default();
    let mut stream = BytesMut::new();

    for id in 0..3u32 {
        let mut msg = P2pMessage::new();
        msg.header.identifier = id;
        msg.set_inner_body(vec![id as u8; id as usize * 7]);
        codec.encode(msg, &mut stream).unwrap();
    }
    assert_eq!(stream.len(), 3 * (LENGTH_PREFIX_SIZE + HEADER_SIZE) + 7 + 14);

    for id in 0..3u32 {
        let decoded = codec.decode(&mut stream).unwrap().unwrap();
        assert_eq!(decoded.header.identifier, id);
        assert_eq!(decoded.message_size(), id * 7);
    }
    assert!(codec.decode(&mut stream).unwrap().is_none());
}

#[test]
fn test_direct_codec_rejects_prefix_below_header() {
    let mut codec = DirectCodec::default();
    let mut stream = BytesMut::from(&(12u32).to_le_bytes()[..]);
    assert!(matches!(
        codec.decode(&mut stream),
        Err(ProtocolError::MalformedMessage {
            expected: HEADER_SIZE,
            actual: 12
        })
    ));
}

#[test]
fn test_standard_to_direct_conversion() {
    let mut relayed = P2pMessage::data_message();
    relayed.header.session_id = 8;
    relayed.header.identifier = 1000;
    relayed.set_inner_body(vec![0x77; 32]);
    let relayed = P2pMessage::decode(&relayed.encode()).unwrap();

    let mut direct = relayed.into_direct();
    let bytes = direct.encode_direct();
    assert_eq!(bytes.len(), LENGTH_PREFIX_SIZE + HEADER_SIZE + 32);

    let decoded = P2pMessage::decode_direct(&bytes[LENGTH_PREFIX_SIZE..]).unwrap();
    assert_eq!(decoded.header.session_id, 8);
    assert_eq!(decoded.header.identifier, 1000);
    assert_eq!(&decoded.inner_body().unwrap()[..], &[0x77; 32]);
}

#[test]
fn test_chunked_transfer_reassembles() {
    let file: Vec<u8> = (0..5000u32).map(|i| (i % 251) as u8).collect();
    let config = P2pConfig::default();

    let mut received = vec![0u8; file.len()];
    let mut count = 0;
    for chunk in DataChunker::new(Cursor::new(&file), file.len() as u64, &config)
        .session_id(9)
        .identifier(42)
        .flags(flags::FILE_DATA)
    {
        let mut chunk = chunk.unwrap();
        let decoded = P2pMessage::decode(&chunk.encode()).unwrap();
        assert!(decoded.is_data_message());
        assert!(decoded.message_size() as usize <= config.max_chunk_size);
        assert_eq!(decoded.header.total_size, file.len() as u64);

        let start = decoded.header.offset as usize;
        let body = decoded.inner_body().unwrap();
        received[start..start + body.len()].copy_from_slice(body);
        count += 1;
    }

    assert_eq!(count, file.len().div_ceil(config.max_chunk_size));
    assert_eq!(received, file);
}

#[test]
fn test_preparation_message() {
    let mut prep = P2pMessage::new();
    prep.header.session_id = 77;
    prep.write_preparation_bytes();

    let bytes = prep.encode();
    assert_eq!(bytes.len(), HEADER_SIZE + 4 + FOOTER_SIZE);
    assert_eq!(&bytes[HEADER_SIZE..HEADER_SIZE + 4], &[0, 0, 0, 0]);
}
