//! # P2P Message
//!
//! The structured P2P binary message and its standard wire format:
//!
//! ```text
//! [Header(48)] [Body(MessageSize)] [Footer(4)]
//! ```
//!
//! A footer of 0 marks a negotiation message; any other value marks a raw data message
//! (see [`P2pMessage::data_message`]).
//!
//! ## Body Resolution
//! A message owns at most one nested message and at most one raw body. When both are
//! present, encoding uses the nested message's bytes and the raw body is ignored.
//! `MessageSize` is recomputed from the resolved body on every encode, and a
//! `TotalSize` of 0 is replaced by the body length.

use crate::error::{ProtocolError, Result};
use crate::p2p::flags;
use crate::p2p::wire::{HostOrder, P2pHeader, FOOTER_SIZE, HEADER_SIZE, MAX_BODY_SIZE};
use bytes::{Buf, BufMut, Bytes};
use std::fmt;
use std::io::Read;

/// Body length written by [`P2pMessage::write_preparation_bytes`]
pub const PREPARATION_BODY_SIZE: usize = 4;

/// A message that can be carried as the body of another message
pub trait WireMessage: fmt::Debug + Send {
    /// Serialize to wire bytes, updating any size fields derived from the content
    fn encode(&mut self) -> Vec<u8>;

    /// Parse from wire bytes
    fn decode(data: &[u8]) -> Result<Self>
    where
        Self: Sized;
}

/// An opaque payload, such as a text protocol message carried inside a P2P message
impl WireMessage for Vec<u8> {
    fn encode(&mut self) -> Vec<u8> {
        self.clone()
    }

    fn decode(data: &[u8]) -> Result<Self> {
        Ok(data.to_vec())
    }
}

#[derive(Debug, Default)]
pub struct P2pMessage {
    pub header: P2pHeader,
    pub footer: u32,
    inner_body: Option<Bytes>,
    inner_message: Option<Box<dyn WireMessage>>,
}

impl P2pMessage {
    /// A negotiation message (footer 0)
    pub fn new() -> Self {
        Self::default()
    }

    /// A data message (footer 1)
    pub fn data_message() -> Self {
        Self {
            footer: 1,
            ..Self::default()
        }
    }

    pub fn with_header(header: P2pHeader) -> Self {
        Self {
            header,
            ..Self::default()
        }
    }

    pub fn message_size(&self) -> u32 {
        self.header.message_size()
    }

    pub fn is_acknowledgement(&self) -> bool {
        self.header.flags == flags::ACKNOWLEDGEMENT
    }

    pub fn is_data_message(&self) -> bool {
        self.footer != 0
    }

    pub fn inner_body(&self) -> Option<&Bytes> {
        self.inner_body.as_ref()
    }

    /// Replace the raw body
    ///
    /// The size fields describe at most [`MAX_BODY_SIZE`] bytes; longer bodies saturate them.
    pub fn set_inner_body(&mut self, body: impl Into<Bytes>) {
        self.inner_body = Some(body.into());
    }

    pub fn take_inner_body(&mut self) -> Option<Bytes> {
        self.inner_body.take()
    }

    pub fn inner_message(&self) -> Option<&dyn WireMessage> {
        self.inner_message.as_deref()
    }

    /// Nest `message` as the body, returning the previously nested message
    pub fn set_inner_message<M>(&mut self, message: M) -> Option<Box<dyn WireMessage>>
    where
        M: WireMessage + 'static,
    {
        self.inner_message.replace(Box::new(message))
    }

    pub fn take_inner_message(&mut self) -> Option<Box<dyn WireMessage>> {
        self.inner_message.take()
    }

    /// Parse the raw body as a nested message of type `M`
    pub fn decode_inner<M: WireMessage>(&self) -> Result<M> {
        M::decode(self.inner_body.as_deref().unwrap_or_default())
    }

    /// Resolve the body to encode and update the size fields from it.
    pub(crate) fn prepare(&mut self) -> Bytes {
        let body = match (&mut self.inner_message, &self.inner_body) {
            (Some(inner), _) => Bytes::from(inner.encode()),
            (None, Some(body)) => body.clone(),
            (None, None) => Bytes::new(),
        };
        self.header.size_for_body(body.len());
        body
    }

    /// Build the acknowledgement for this message
    ///
    /// The acknowledgement echoes the identifier, first ack field and total size of the
    /// source, and carries `WaitingReply` over when the source is waiting for a reply.
    pub fn create_acknowledgement(&self) -> P2pMessage {
        let mut ack = P2pMessage::new();
        ack.header.total_size = self.header.total_size;
        ack.header.flags = flags::acknowledgement_for(self.header.flags);
        ack.header.ack1 = self.header.identifier;
        ack.header.ack2 = self.header.ack1;
        ack.header.ack_total = self.header.total_size;
        ack
    }

    /// Replace the body with four NUL bytes, the data preparation message
    pub fn write_preparation_bytes(&mut self) {
        self.inner_body = Some(Bytes::from_static(&[0u8; PREPARATION_BODY_SIZE]));
    }

    /// Replace the body with up to `max_len` bytes read from `source`
    ///
    /// Reads until `max_len` bytes are collected or the source is exhausted and
    /// returns the number of bytes now in the body.
    ///
    /// # Errors
    /// Returns `ProtocolError::OversizedFrame` if `max_len` exceeds [`MAX_BODY_SIZE`],
    /// before anything is read.
    pub fn write_bytes<R: Read>(&mut self, source: &mut R, max_len: usize) -> Result<usize> {
        if max_len > MAX_BODY_SIZE {
            return Err(ProtocolError::OversizedFrame(max_len));
        }
        let mut body = Vec::with_capacity(max_len.min(64 * 1024));
        source.take(max_len as u64).read_to_end(&mut body)?;
        let read = body.len();
        self.inner_body = Some(Bytes::from(body));
        Ok(read)
    }

    /// Serialize in the standard format using the executing host's byte order
    pub fn encode(&mut self) -> Vec<u8> {
        self.encode_with(HostOrder::native())
    }

    /// Serialize in the standard format as a host of byte order `host` would
    pub fn encode_with(&mut self, host: HostOrder) -> Vec<u8> {
        let body = self.prepare();

        let mut out = Vec::with_capacity(HEADER_SIZE + body.len() + FOOTER_SIZE);
        self.header.write(&mut out, host);
        out.put_slice(&body);
        host.put_u32(&mut out, self.footer);
        out
    }

    /// Parse a standard-format message using the executing host's byte order
    pub fn decode(data: &[u8]) -> Result<Self> {
        Self::decode_with(data, HostOrder::native())
    }

    /// Parse a standard-format message as a host of byte order `host` would
    ///
    /// # Errors
    /// Returns `ProtocolError::MalformedMessage` if `data` is shorter than the header,
    /// the declared body and the footer together.
    pub fn decode_with(data: &[u8], host: HostOrder) -> Result<Self> {
        let mut buf = data;
        let (header, body) = read_header_and_body(&mut buf, host, FOOTER_SIZE)?;
        let footer = host.get_u32(&mut buf);

        Ok(Self {
            header,
            footer,
            inner_body: Some(body),
            inner_message: None,
        })
    }
}

/// Read the header and declared body from `buf`, requiring `trailer` more bytes after it.
pub(crate) fn read_header_and_body(
    buf: &mut &[u8],
    host: HostOrder,
    trailer: usize,
) -> Result<(P2pHeader, Bytes)> {
    let available = buf.len();
    let minimum = HEADER_SIZE + trailer;
    if available < minimum {
        return Err(ProtocolError::MalformedMessage {
            expected: minimum,
            actual: available,
        });
    }

    let header = P2pHeader::read(buf, host);
    let body_len = header.message_size() as usize;
    let expected = minimum.saturating_add(body_len);
    if available < expected {
        return Err(ProtocolError::MalformedMessage {
            expected,
            actual: available,
        });
    }

    let body = Bytes::copy_from_slice(&buf[..body_len]);
    buf.advance(body_len);
    Ok((header, body))
}

pub(crate) fn fmt_header(f: &mut fmt::Formatter<'_>, header: &P2pHeader) -> fmt::Result {
    writeln!(f, "SessionId   : {:x} ({})", header.session_id, header.session_id)?;
    writeln!(f, "Identifier  : {:x} ({})", header.identifier, header.identifier)?;
    writeln!(f, "Offset      : {:x} ({})", header.offset, header.offset)?;
    writeln!(f, "TotalSize   : {:x} ({})", header.total_size, header.total_size)?;
    writeln!(
        f,
        "MessageSize : {:x} ({})",
        header.message_size(),
        header.message_size()
    )?;
    writeln!(f, "Flags       : {:x} ({})", header.flags, header.flags)
}

impl fmt::Display for P2pMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = if self.is_data_message() {
            "P2PDataMessage"
        } else {
            "P2PMessage"
        };
        writeln!(f, "[{name}]")?;
        fmt_header(f, &self.header)?;
        writeln!(f, "Ack1        : {:x} ({})", self.header.ack1, self.header.ack1)?;
        writeln!(f, "Ack2        : {:x} ({})", self.header.ack2, self.header.ack2)?;
        writeln!(
            f,
            "AckTotal    : {:x} ({})",
            self.header.ack_total, self.header.ack_total
        )?;
        writeln!(f, "Footer      : {:x} ({})", self.footer, self.footer)
    }
}

impl WireMessage for P2pMessage {
    fn encode(&mut self) -> Vec<u8> {
        self.encode_with(HostOrder::native())
    }

    fn decode(data: &[u8]) -> Result<Self> {
        Self::decode_with(data, HostOrder::native())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_encode_sets_sizes_from_body() {
        let mut msg = P2pMessage::new();
        msg.set_inner_body(vec![1u8, 2, 3]);

        let bytes = msg.encode();
        assert_eq!(bytes.len(), HEADER_SIZE + 3 + FOOTER_SIZE);
        assert_eq!(msg.message_size(), 3);
        assert_eq!(msg.header.total_size, 3);
        assert_eq!(&bytes[24..28], &[3, 0, 0, 0]);
        assert_eq!(&bytes[48..51], &[1, 2, 3]);
    }

    #[test]
    fn test_message_size_is_recomputed_on_reencode() {
        let mut msg = P2pMessage::new();
        msg.header.total_size = 100;
        msg.set_inner_body(vec![0u8; 10]);
        msg.encode();
        assert_eq!(msg.message_size(), 10);

        msg.set_inner_body(vec![0u8; 4]);
        msg.encode();
        assert_eq!(msg.message_size(), 4);
        assert_eq!(msg.header.total_size, 100);
    }

    #[test]
    fn test_nested_message_wins_over_raw_body() {
        let mut msg = P2pMessage::new();
        msg.set_inner_body(vec![0xAAu8; 8]);
        msg.set_inner_message(b"INVITE".to_vec());

        let bytes = msg.encode();
        assert_eq!(msg.message_size(), 6);
        assert_eq!(&bytes[48..54], b"INVITE");
    }

    #[test]
    fn test_last_nested_message_is_authoritative() {
        let mut msg = P2pMessage::new();
        assert!(msg.set_inner_message(b"first".to_vec()).is_none());
        let previous = msg.set_inner_message(b"second!".to_vec());
        assert!(previous.is_some());

        msg.encode();
        assert_eq!(msg.message_size(), 7);
    }

    #[test]
    fn test_decode_rejects_truncated_input() {
        let err = P2pMessage::decode(&[0u8; 20]).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::MalformedMessage {
                expected: 52,
                actual: 20
            }
        ));
    }

    #[test]
    fn test_decode_rejects_missing_body() {
        let mut msg = P2pMessage::new();
        msg.set_inner_body(vec![7u8; 16]);
        let bytes = msg.encode();

        let err = P2pMessage::decode(&bytes[..bytes.len() - 8]).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::MalformedMessage { expected: 68, .. }
        ));
    }

    #[test]
    fn test_acknowledgement_echoes_source_fields() {
        let mut msg = P2pMessage::new();
        msg.header.identifier = 7;
        msg.header.ack1 = 3;
        msg.header.total_size = 500;

        let ack = msg.create_acknowledgement();
        assert_eq!(ack.header.ack1, 7);
        assert_eq!(ack.header.ack2, 3);
        assert_eq!(ack.header.ack_total, 500);
        assert_eq!(ack.header.total_size, 500);
        assert_eq!(ack.header.flags, flags::ACKNOWLEDGEMENT);
        assert!(ack.is_acknowledgement());

        msg.header.flags = flags::WAITING_REPLY;
        let ack = msg.create_acknowledgement();
        assert_eq!(ack.header.flags, 0x06);
        assert!(!ack.is_acknowledgement());
    }

    #[test]
    fn test_data_message_footer() {
        let mut msg = P2pMessage::data_message();
        assert!(msg.is_data_message());
        msg.write_preparation_bytes();

        let bytes = msg.encode();
        assert_eq!(msg.message_size(), 4);
        assert_eq!(&bytes[48..52], &[0, 0, 0, 0]);
        assert_eq!(&bytes[52..56], &[1, 0, 0, 0]);
    }

    #[test]
    fn test_write_bytes_is_bounded_by_max_len_and_source() {
        let mut msg = P2pMessage::data_message();
        let mut source = Cursor::new(vec![5u8; 10]);

        assert_eq!(msg.write_bytes(&mut source, 4).unwrap(), 4);
        assert_eq!(msg.inner_body().unwrap().len(), 4);
        assert_eq!(msg.write_bytes(&mut source, 100).unwrap(), 6);
        assert_eq!(msg.write_bytes(&mut source, 100).unwrap(), 0);
        assert!(msg.inner_body().unwrap().is_empty());
    }

    #[test]
    fn test_write_bytes_rejects_lengths_the_header_cannot_hold() {
        let mut msg = P2pMessage::data_message();
        msg.set_inner_body(b"kept".to_vec());
        let mut source = Cursor::new(vec![5u8; 10]);

        assert!(matches!(
            msg.write_bytes(&mut source, MAX_BODY_SIZE + 1),
            Err(ProtocolError::OversizedFrame(len)) if len == MAX_BODY_SIZE + 1
        ));
        assert_eq!(source.position(), 0);
        assert_eq!(&msg.inner_body().unwrap()[..], b"kept");
    }

    #[test]
    fn test_take_body_and_nested_message() {
        let mut msg = P2pMessage::new();
        msg.set_inner_body(b"raw".to_vec());
        msg.set_inner_message(b"nested".to_vec());

        let nested = msg.take_inner_message().unwrap();
        assert_eq!(format!("{nested:?}"), format!("{:?}", b"nested".to_vec()));
        assert!(msg.inner_message().is_none());

        // with the nested message gone the raw body is encoded again
        msg.encode();
        assert_eq!(msg.message_size(), 3);

        assert_eq!(&msg.take_inner_body().unwrap()[..], b"raw");
        assert!(msg.take_inner_body().is_none());
        msg.encode();
        assert_eq!(msg.message_size(), 0);
    }

    #[test]
    fn test_display_names_message_kind() {
        let rendered = P2pMessage::new().to_string();
        assert!(rendered.starts_with("[P2PMessage]"));
        assert!(rendered.contains("Footer      : 0 (0)"));
        assert!(P2pMessage::data_message()
            .to_string()
            .starts_with("[P2PDataMessage]"));
    }
}
