//! Example: Framing a notification-server stream and unpacking a P2P message
//!
//! Builds a short session transcript containing a `MSG` whose payload carries a
//! binary P2P message, feeds it to the pool in uneven reads, then decodes the P2P
//! message and answers it with an acknowledgement.
//!
//! Run with: `cargo run --example frame_stream`

#![allow(clippy::uninlined_format_args)]

use msnp_wire::core::pool::{MessagePool, NsMessagePool};
use msnp_wire::p2p::flags;
use msnp_wire::utils::logging::init_logging;
use msnp_wire::{P2pMessage, WireConfig};

const P2P_MIME_HEADER: &[u8] =
    b"MIME-Version: 1.0\r\nContent-Type: application/x-msnmsgrp2p\r\nP2P-Dest: bob@example.com\r\n\r\n";

fn transcript() -> Vec<u8> {
    let mut invite = P2pMessage::new();
    invite.header.session_id = 0;
    invite.header.identifier = 0x0BAD_0001;
    invite.header.flags = flags::NORMAL;
    invite.header.ack1 = 0x1234_5678;
    invite.set_inner_body(b"INVITE MSNMSGR:bob@example.com MSNSLP/1.0\r\n\r\n\0".to_vec());

    let mut payload = P2P_MIME_HEADER.to_vec();
    payload.extend_from_slice(&invite.encode());

    let mut stream = b"USR 8 OK alice@example.com 1 0\r\n".to_vec();
    stream.extend_from_slice(format!("MSG alice@example.com Alice {}\r\n", payload.len()).as_bytes());
    stream.extend_from_slice(&payload);
    stream.extend_from_slice(b"CHG 9 NLN 0\r\n");
    stream
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = WireConfig::from_env()?;
    config.validate_strict()?;
    init_logging(&config.logging);

    let mut pool = NsMessagePool::from_config(&config.pool)?;
    let stream = transcript();
    println!("=== Framing {} bytes in reads of 37 bytes ===\n", stream.len());

    for read in stream.chunks(37) {
        pool.feed(read);

        while pool.has_message() {
            let block = pool.next_message()?;
            let Some(line_end) = block.iter().position(|&b| b == b'\n') else {
                continue;
            };
            println!(
                "block ({} bytes): {}",
                block.len(),
                String::from_utf8_lossy(&block[..line_end]).trim_end()
            );

            if !block.starts_with(b"MSG ") {
                continue;
            }

            let payload = &block[line_end + 1..];
            let Some(split) = payload.windows(4).position(|w| w == b"\r\n\r\n") else {
                continue;
            };
            let message = P2pMessage::decode(&payload[split + 4..])?;
            println!("\n{}", message);

            let mut ack = message.create_acknowledgement();
            let ack_bytes = ack.encode();
            println!("{}", ack);
            println!("Acknowledgement encodes to {} bytes\n", ack_bytes.len());
        }
    }

    Ok(())
}
