#![no_main]

use libfuzzer_sys::fuzz_target;
use msnp_wire::core::pool::{MessagePool, NsMessagePool};

fuzz_target!(|data: &[u8]| {
    // First byte picks the read size, the rest is the stream
    let Some((&split, stream)) = data.split_first() else {
        return;
    };
    let read_size = usize::from(split).max(1);

    let mut pool = NsMessagePool::new();
    let mut total = 0;
    for chunk in stream.chunks(read_size) {
        pool.feed(chunk);
        while let Ok(block) = pool.next_message() {
            total += block.len();
        }
    }
    assert_eq!(total + pool.pending_bytes(), stream.len());
});
