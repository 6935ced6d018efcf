//! # Notification Server Codec
//!
//! Adapts [`NsMessagePool`] to [`tokio_util::codec`] so a notification-server
//! connection can be driven through `Framed`/`FramedRead`.
//!
//! Every byte handed to the decoder is moved into the pool immediately; the pool owns
//! all buffering state, so the `BytesMut` passed by the framer is always left empty.
//! Decoded items are complete message blocks in arrival order. Encoding writes
//! already serialized command blocks through unchanged.

use crate::core::pool::{CommandSet, MessagePool, NsMessagePool, PayloadCommands};
use crate::error::{ProtocolError, Result};
use bytes::{BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

#[derive(Debug)]
pub struct NsCodec<P = CommandSet> {
    pool: NsMessagePool<P>,
}

impl NsCodec<CommandSet> {
    pub fn new() -> Self {
        Self::with_pool(NsMessagePool::new())
    }
}

impl Default for NsCodec<CommandSet> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: PayloadCommands> NsCodec<P> {
    /// Wrap an existing pool
    pub fn with_pool(pool: NsMessagePool<P>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &NsMessagePool<P> {
        &self.pool
    }

    pub fn into_pool(self) -> NsMessagePool<P> {
        self.pool
    }
}

impl<P: PayloadCommands> Decoder for NsCodec<P> {
    type Item = Bytes;
    type Error = ProtocolError;

    /// Feeds all buffered bytes into the pool and yields the oldest completed block
    ///
    /// Returns `None` while no block is complete.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>> {
        if !src.is_empty() {
            let chunk = src.split();
            self.pool.feed(&chunk);
        }

        if self.pool.has_message() {
            self.pool.next_message().map(Some)
        } else {
            Ok(None)
        }
    }
}

impl<P> Encoder<Bytes> for NsCodec<P> {
    type Error = ProtocolError;

    fn encode(&mut self, block: Bytes, dst: &mut BytesMut) -> Result<()> {
        dst.reserve(block.len());
        dst.put_slice(&block);
        Ok(())
    }
}
