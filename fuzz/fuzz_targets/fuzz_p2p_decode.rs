#![no_main]

use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use msnp_wire::{DirectCodec, P2pMessage};
use tokio_util::codec::Decoder;

fuzz_target!(|data: &[u8]| {
    // Standard and direct decoding must fail cleanly on arbitrary input
    if let Ok(mut msg) = P2pMessage::decode(data) {
        let reencoded = msg.encode();
        assert!(reencoded.len() <= data.len());
    }
    let _ = P2pMessage::decode_direct(data);
    let _ = P2pMessage::decode_direct_prefixed(data);

    let mut codec = DirectCodec::default();
    let mut buffer = BytesMut::from(data);
    while let Ok(Some(_)) = codec.decode(&mut buffer) {}
});
