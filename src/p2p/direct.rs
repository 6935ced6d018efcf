//! # Direct-Connection Messages
//!
//! P2P messages exchanged over a direct TCP connection between peers carry no footer.
//! Instead each message is preceded by a 4-byte little-endian length covering the
//! header and body:
//!
//! ```text
//! [Length(4) = 48 + MessageSize] [Header(48)] [Body(MessageSize)]
//! ```
//!
//! [`DirectCodec`] frames a direct-connection byte stream into such messages for use
//! with `tokio_util::codec::Framed`.

use crate::config::P2pConfig;
use crate::error::{ProtocolError, Result};
use crate::p2p::message::{read_header_and_body, P2pMessage};
use crate::p2p::wire::{frame_size_field, HostOrder, HEADER_SIZE, LENGTH_PREFIX_SIZE};
use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

impl P2pMessage {
    /// Serialize in the direct-connection format using the executing host's byte order
    pub fn encode_direct(&mut self) -> Vec<u8> {
        self.encode_direct_with(HostOrder::native())
    }

    /// Serialize in the direct-connection format as a host of byte order `host` would
    pub fn encode_direct_with(&mut self, host: HostOrder) -> Vec<u8> {
        let body = self.prepare();
        let mut out = Vec::with_capacity(LENGTH_PREFIX_SIZE + HEADER_SIZE + body.len());
        self.write_direct(&mut out, host, &body);
        out
    }

    /// Write the prefix, header and an already prepared body
    fn write_direct<B: BufMut>(&self, out: &mut B, host: HostOrder, body: &[u8]) {
        host.put_u32(out, frame_size_field(body.len()));
        self.header.write(out, host);
        out.put_slice(body);
    }

    /// Parse a direct-connection message whose length prefix has already been consumed
    ///
    /// `data` starts at the header. Bytes produced by
    /// [`encode_direct`](Self::encode_direct) start at the prefix and go through
    /// [`decode_direct_prefixed`](Self::decode_direct_prefixed) or [`DirectCodec`] instead.
    pub fn decode_direct(data: &[u8]) -> Result<Self> {
        Self::decode_direct_with(data, HostOrder::native())
    }

    /// Parse header and body only, as a host of byte order `host` would
    ///
    /// # Errors
    /// Returns `ProtocolError::MalformedMessage` if `data` is shorter than the header
    /// and the declared body together.
    pub fn decode_direct_with(data: &[u8], host: HostOrder) -> Result<Self> {
        let mut buf = data;
        let (header, body) = read_header_and_body(&mut buf, host, 0)?;

        let mut message = P2pMessage::with_header(header);
        message.set_inner_body(body);
        Ok(message)
    }

    /// Parse a complete direct-connection message, length prefix included
    pub fn decode_direct_prefixed(data: &[u8]) -> Result<Self> {
        Self::decode_direct_prefixed_with(data, HostOrder::native())
    }

    /// Parse prefix, header and body as a host of byte order `host` would
    ///
    /// # Errors
    /// - `MalformedMessage` if `data` cannot hold the prefix, header and declared body
    /// - `LengthMismatch` if the prefix disagrees with the header's message size
    pub fn decode_direct_prefixed_with(data: &[u8], host: HostOrder) -> Result<Self> {
        if data.len() < LENGTH_PREFIX_SIZE + HEADER_SIZE {
            return Err(ProtocolError::MalformedMessage {
                expected: LENGTH_PREFIX_SIZE + HEADER_SIZE,
                actual: data.len(),
            });
        }

        let mut buf = data;
        let declared = host.get_u32(&mut buf) as usize;
        let message = Self::decode_direct_with(buf, host)?;
        check_frame_length(declared, &message)?;
        Ok(message)
    }

    /// Copy of `message` re-targeted at a direct connection
    ///
    /// Header fields and the resolved body are kept; the footer is dropped.
    pub fn into_direct(mut self) -> P2pMessage {
        let body = self.prepare();
        let mut direct = P2pMessage::with_header(self.header);
        direct.set_inner_body(body);
        direct
    }
}

/// The length prefix must cover exactly the header and the declared body.
fn check_frame_length(declared: usize, message: &P2pMessage) -> Result<()> {
    let carried = HEADER_SIZE + message.message_size() as usize;
    if carried != declared {
        return Err(ProtocolError::LengthMismatch {
            declared,
            actual: carried,
        });
    }
    Ok(())
}

/// Length-prefixed framing of direct-connection P2P messages
#[derive(Debug, Clone)]
pub struct DirectCodec {
    max_frame_size: usize,
}

impl DirectCodec {
    pub fn new(config: &P2pConfig) -> Self {
        Self {
            max_frame_size: config.max_frame_size,
        }
    }
}

impl Default for DirectCodec {
    fn default() -> Self {
        Self::new(&P2pConfig::default())
    }
}

impl Decoder for DirectCodec {
    type Item = P2pMessage;
    type Error = ProtocolError;

    /// Decodes one length-prefixed message from the byte stream
    ///
    /// Returns `None` if there aren't enough bytes to form a complete frame.
    ///
    /// # Errors
    /// - `OversizedFrame` if the prefix exceeds the configured maximum
    /// - `MalformedMessage` if the prefix cannot hold a header
    /// - `LengthMismatch` if the prefix disagrees with the header's message size
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<P2pMessage>> {
        if src.len() < LENGTH_PREFIX_SIZE {
            return Ok(None);
        }

        let declared = u32::from_le_bytes([src[0], src[1], src[2], src[3]]) as usize;
        if declared > self.max_frame_size {
            return Err(ProtocolError::OversizedFrame(declared));
        }
        if declared < HEADER_SIZE {
            return Err(ProtocolError::MalformedMessage {
                expected: HEADER_SIZE,
                actual: declared,
            });
        }

        let total_len = LENGTH_PREFIX_SIZE + declared;
        if src.len() < total_len {
            src.reserve(total_len - src.len());
            return Ok(None); // Wait for full frame
        }

        src.advance(LENGTH_PREFIX_SIZE);
        let frame = src.split_to(declared).freeze();
        let message = P2pMessage::decode_direct(&frame)?;
        check_frame_length(declared, &message)?;

        trace!(
            session_id = message.header.session_id,
            identifier = message.header.identifier,
            size = declared,
            "Direct-connection frame decoded"
        );
        Ok(Some(message))
    }
}

impl Encoder<P2pMessage> for DirectCodec {
    type Error = ProtocolError;

    /// # Errors
    /// Returns `OversizedFrame` if header and body exceed the configured maximum;
    /// nothing is written to `dst` then.
    fn encode(&mut self, mut message: P2pMessage, dst: &mut BytesMut) -> Result<()> {
        let body = message.prepare();
        let frame_size = HEADER_SIZE.saturating_add(body.len());
        if frame_size > self.max_frame_size {
            return Err(ProtocolError::OversizedFrame(frame_size));
        }

        dst.reserve(LENGTH_PREFIX_SIZE + frame_size);
        message.write_direct(dst, HostOrder::native(), &body);
        Ok(())
    }
}
