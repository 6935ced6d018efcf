#![no_main]

use libfuzzer_sys::fuzz_target;
use msnp_wire::HandshakeMessage;

fuzz_target!(|data: &[u8]| {
    // Fuzz handshake parsing - marker, length prefix and GUID checks must not panic
    let _ = HandshakeMessage::decode(data);
});
