//! Slicing a byte source into P2P data messages.
//!
//! Every chunk of one transfer shares the session, identifier, flags and total size;
//! the offset advances by the size of each chunk.

use crate::config::P2pConfig;
use crate::error::Result;
use crate::p2p::message::P2pMessage;
use std::io::Read;
use tracing::trace;

#[derive(Debug)]
pub struct DataChunker<R> {
    source: R,
    chunk_size: usize,
    total_size: u64,
    offset: u64,
    session_id: u32,
    identifier: u32,
    flags: u32,
    footer: u32,
    done: bool,
}

impl<R: Read> DataChunker<R> {
    /// Chunk `total_size` bytes of `source` into bodies of at most `max_chunk_size`
    pub fn new(source: R, total_size: u64, config: &P2pConfig) -> Self {
        Self {
            source,
            chunk_size: config.max_chunk_size.max(1),
            total_size,
            offset: 0,
            session_id: 0,
            identifier: 0,
            flags: 0,
            footer: 1,
            done: total_size == 0,
        }
    }

    pub fn session_id(mut self, session_id: u32) -> Self {
        self.session_id = session_id;
        self
    }

    pub fn identifier(mut self, identifier: u32) -> Self {
        self.identifier = identifier;
        self
    }

    pub fn flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }

    /// Footer (application identifier) of every chunk; data messages default to 1
    pub fn footer(mut self, footer: u32) -> Self {
        self.footer = footer;
        self
    }

    /// Offset of the next chunk
    pub fn offset(&self) -> u64 {
        self.offset
    }

    fn next_chunk(&mut self) -> Result<Option<P2pMessage>> {
        let left = self.total_size.saturating_sub(self.offset);
        let max_len = (self.chunk_size as u64).min(left) as usize;

        let mut message = P2pMessage::data_message();
        let read = message.write_bytes(&mut self.source, max_len)?;
        if read == 0 {
            self.done = true;
            return Ok(None);
        }

        message.header.session_id = self.session_id;
        message.header.identifier = self.identifier;
        message.header.flags = self.flags;
        message.header.offset = self.offset;
        message.header.total_size = self.total_size;
        message.footer = self.footer;

        self.offset += read as u64;
        if self.offset >= self.total_size {
            self.done = true;
        }

        trace!(
            session_id = self.session_id,
            offset = message.header.offset,
            len = read,
            "Data chunk read"
        );
        Ok(Some(message))
    }
}

impl<R: Read> Iterator for DataChunker<R> {
    type Item = Result<P2pMessage>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.next_chunk() {
            Ok(chunk) => chunk.map(Ok),
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
