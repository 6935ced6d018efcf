//! # Direct-Connection Handshake
//!
//! The first message exchanged after a direct connection is established. It wraps the
//! direct-connection format between a fixed marker and the 16-byte connection GUID:
//!
//! ```text
//! [Marker(8)] [Length(4)] [Header(48)] [Body(MessageSize)] [Guid(16)]
//! ```
//!
//! The marker is `04 00 00 00 66 6f 6f 00`, a length-prefixed `"foo\0"`.
//!
//! The GUID is normally agreed during invitation and travels in the generic ack fields
//! of a negotiation message; [`Guid::from_ack_fields`] recovers it from there.

use crate::error::{constants, ProtocolError, Result};
use crate::p2p::flags;
use crate::p2p::message::{fmt_header, read_header_and_body, P2pMessage, WireMessage};
use crate::p2p::wire::{frame_size_field, HostOrder, P2pHeader, HEADER_SIZE, LENGTH_PREFIX_SIZE};
use bytes::{Buf, BufMut, Bytes};
use std::fmt;

/// Bytes preceding every handshake message
pub const HANDSHAKE_MARKER: [u8; 8] = [0x04, 0x00, 0x00, 0x00, 0x66, 0x6f, 0x6f, 0x00];

/// Size of the trailing GUID
pub const GUID_SIZE: usize = 16;

/// Smallest possible handshake message (empty body)
pub const MIN_HANDSHAKE_SIZE: usize =
    HANDSHAKE_MARKER.len() + LENGTH_PREFIX_SIZE + HEADER_SIZE + GUID_SIZE;

/// A 16-byte GUID in its mixed-endian byte form
///
/// The byte form holds a 4-byte group and two 2-byte groups as little-endian integers,
/// followed by 8 bytes in order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Guid([u8; GUID_SIZE]);

impl Guid {
    pub const NIL: Guid = Guid([0u8; GUID_SIZE]);

    pub const fn from_bytes(bytes: [u8; GUID_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn from_fields(data1: u32, data2: u16, data3: u16, data4: [u8; 8]) -> Self {
        let mut bytes = [0u8; GUID_SIZE];
        bytes[0..4].copy_from_slice(&data1.to_le_bytes());
        bytes[4..6].copy_from_slice(&data2.to_le_bytes());
        bytes[6..8].copy_from_slice(&data3.to_le_bytes());
        bytes[8..16].copy_from_slice(&data4);
        Self(bytes)
    }

    /// Reinterpret the generic ack fields of a P2P header as a GUID
    ///
    /// `ack1` becomes the 4-byte group, the low and high halves of `ack2` the two
    /// 2-byte groups, and the bytes of `ack_total` in ascending order the 8-byte tail.
    pub fn from_ack_fields(ack1: u32, ack2: u32, ack_total: u64) -> Self {
        Self::from_fields(
            ack1,
            (ack2 & 0x0000_FFFF) as u16,
            (ack2 >> 16) as u16,
            ack_total.to_le_bytes(),
        )
    }

    /// A random GUID from the operating system's RNG
    pub fn new_random() -> Result<Self> {
        let mut bytes = [0u8; GUID_SIZE];
        getrandom::fill(&mut bytes).map_err(|e| {
            ProtocolError::RandomError(format!("{}: {e}", constants::ERR_HANDSHAKE_RANDOM))
        })?;
        Ok(Self(bytes))
    }

    pub const fn as_bytes(&self) -> &[u8; GUID_SIZE] {
        &self.0
    }

    pub fn data1(&self) -> u32 {
        u32::from_le_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }

    pub fn data2(&self) -> u16 {
        u16::from_le_bytes([self.0[4], self.0[5]])
    }

    pub fn data3(&self) -> u16 {
        u16::from_le_bytes([self.0[6], self.0[7]])
    }

    pub fn data4(&self) -> [u8; 8] {
        let mut tail = [0u8; 8];
        tail.copy_from_slice(&self.0[8..16]);
        tail
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d4 = self.data4();
        write!(
            f,
            "{:08x}-{:04x}-{:04x}-{:02x}{:02x}-",
            self.data1(),
            self.data2(),
            self.data3(),
            d4[0],
            d4[1]
        )?;
        d4[2..].iter().try_for_each(|b| write!(f, "{b:02x}"))
    }
}

impl From<[u8; GUID_SIZE]> for Guid {
    fn from(bytes: [u8; GUID_SIZE]) -> Self {
        Self(bytes)
    }
}

/// Handshake message of a direct connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeMessage {
    pub header: P2pHeader,
    body: Bytes,
    pub guid: Guid,
}

impl HandshakeMessage {
    /// A handshake carrying `guid`, with the handshake flag set
    pub fn new(guid: Guid) -> Self {
        let mut header = P2pHeader::default();
        header.flags = flags::HANDSHAKE;
        Self {
            header,
            body: Bytes::new(),
            guid,
        }
    }

    /// Take over the header and body of `message`, deriving the GUID from its ack fields
    pub fn from_message(mut message: P2pMessage) -> Self {
        let body = message.prepare();
        let header = message.header;
        Self {
            header,
            body,
            guid: Guid::from_ack_fields(header.ack1, header.ack2, header.ack_total),
        }
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Replace the body; at most [`MAX_BODY_SIZE`](crate::p2p::wire::MAX_BODY_SIZE) bytes can be described by the header.
    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        self.body = body.into();
    }

    pub fn message_size(&self) -> u32 {
        self.header.message_size()
    }

    /// The acknowledgement of a handshake is the same handshake with identifier 0,
    /// leaving the local side to assign its own identifier.
    pub fn create_acknowledgement(&self) -> Self {
        let mut ack = self.clone();
        ack.header.identifier = 0;
        ack
    }

    /// Serialize using the executing host's byte order
    pub fn encode(&mut self) -> Vec<u8> {
        self.encode_with(HostOrder::native())
    }

    pub fn encode_with(&mut self, host: HostOrder) -> Vec<u8> {
        self.header.size_for_body(self.body.len());

        let mut out = Vec::with_capacity(MIN_HANDSHAKE_SIZE + self.body.len());
        out.put_slice(&HANDSHAKE_MARKER);
        host.put_u32(&mut out, frame_size_field(self.body.len()));
        self.header.write(&mut out, host);
        out.put_slice(&self.body);
        out.put_slice(self.guid.as_bytes());
        out
    }

    /// Parse using the executing host's byte order
    pub fn decode(data: &[u8]) -> Result<Self> {
        Self::decode_with(data, HostOrder::native())
    }

    /// # Errors
    /// - `MalformedMessage` if `data` cannot hold marker, prefix, header, body and GUID
    /// - `InvalidMarker` if the marker bytes differ
    /// - `LengthMismatch` if the length prefix disagrees with the header's message size
    pub fn decode_with(data: &[u8], host: HostOrder) -> Result<Self> {
        if data.len() < MIN_HANDSHAKE_SIZE {
            return Err(ProtocolError::MalformedMessage {
                expected: MIN_HANDSHAKE_SIZE,
                actual: data.len(),
            });
        }
        if data[..HANDSHAKE_MARKER.len()] != HANDSHAKE_MARKER {
            return Err(ProtocolError::InvalidMarker);
        }

        let mut buf = &data[HANDSHAKE_MARKER.len()..];
        let declared = host.get_u32(&mut buf) as usize;
        let (header, body) = read_header_and_body(&mut buf, host, GUID_SIZE)?;

        let carried = HEADER_SIZE + body.len();
        if declared != carried {
            return Err(ProtocolError::LengthMismatch {
                declared,
                actual: carried,
            });
        }

        let mut guid = [0u8; GUID_SIZE];
        buf.copy_to_slice(&mut guid);

        Ok(Self {
            header,
            body,
            guid: Guid(guid),
        })
    }
}

impl Default for HandshakeMessage {
    fn default() -> Self {
        Self::new(Guid::NIL)
    }
}

impl fmt::Display for HandshakeMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[P2PDCHandshakeMessage]")?;
        fmt_header(f, &self.header)?;
        writeln!(f, "Guid        : {}", self.guid)
    }
}

impl WireMessage for HandshakeMessage {
    fn encode(&mut self) -> Vec<u8> {
        self.encode_with(HostOrder::native())
    }

    fn decode(data: &[u8]) -> Result<Self> {
        Self::decode_with(data, HostOrder::native())
    }
}
