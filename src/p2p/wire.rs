//! # P2P Wire Layout
//!
//! The fixed 48-byte P2P header and the byte-order handling shared by every
//! message variant.
//!
//! ```text
//! 0  : SessionId    u32
//! 4  : Identifier   u32
//! 8  : Offset       u64
//! 16 : TotalSize    u64
//! 24 : MessageSize  u32
//! 28 : Flags        u32
//! 32 : Ack1         u32
//! 36 : Ack2         u32
//! 40 : AckTotal     u64
//! ```
//!
//! All fields are little-endian on the wire. Values pass through a [`HostOrder`]:
//! on a big-endian host the in-memory representation of a value is reversed before it
//! is written and after it is read, so the wire bytes never depend on the host. The
//! host order can be chosen explicitly, which lets both paths run under test on any
//! machine.

use bytes::{Buf, BufMut};

/// Size of the fixed P2P header
pub const HEADER_SIZE: usize = 48;

/// Size of the trailing footer of standard messages
pub const FOOTER_SIZE: usize = 4;

/// Size of the length prefix of direct-connection messages
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Largest body whose header and length prefix fields can describe it
///
/// Size fields are written as `u32`; longer bodies saturate them at `u32::MAX`.
pub const MAX_BODY_SIZE: usize = u32::MAX as usize - HEADER_SIZE;

/// `len` as a `u32` size field, saturating past `u32::MAX`
pub(crate) fn size_field(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

/// Length prefix of a header followed by `body_len` bytes
pub(crate) fn frame_size_field(body_len: usize) -> u32 {
    size_field(HEADER_SIZE.saturating_add(body_len))
}

/// Byte order of the machine holding a value in memory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostOrder {
    Little,
    Big,
}

impl HostOrder {
    /// Byte order of the executing machine
    pub const fn native() -> Self {
        if cfg!(target_endian = "big") {
            HostOrder::Big
        } else {
            HostOrder::Little
        }
    }

    /// In-memory layout of `value` on a host of this order
    pub fn represent_u32(self, value: u32) -> [u8; 4] {
        match self {
            HostOrder::Little => value.to_le_bytes(),
            HostOrder::Big => value.to_be_bytes(),
        }
    }

    /// In-memory layout of `value` on a host of this order
    pub fn represent_u64(self, value: u64) -> [u8; 8] {
        match self {
            HostOrder::Little => value.to_le_bytes(),
            HostOrder::Big => value.to_be_bytes(),
        }
    }

    fn interpret_u32(self, repr: [u8; 4]) -> u32 {
        match self {
            HostOrder::Little => u32::from_le_bytes(repr),
            HostOrder::Big => u32::from_be_bytes(repr),
        }
    }

    fn interpret_u64(self, repr: [u8; 8]) -> u64 {
        match self {
            HostOrder::Little => u64::from_le_bytes(repr),
            HostOrder::Big => u64::from_be_bytes(repr),
        }
    }

    pub fn put_u32<B: BufMut>(self, buf: &mut B, value: u32) {
        let mut repr = self.represent_u32(value);
        if self == HostOrder::Big {
            repr.reverse();
        }
        buf.put_slice(&repr);
    }

    pub fn put_u64<B: BufMut>(self, buf: &mut B, value: u64) {
        let mut repr = self.represent_u64(value);
        if self == HostOrder::Big {
            repr.reverse();
        }
        buf.put_slice(&repr);
    }

    /// Caller guarantees `buf.remaining() >= 4`
    pub fn get_u32<B: Buf>(self, buf: &mut B) -> u32 {
        let mut repr = [0u8; 4];
        buf.copy_to_slice(&mut repr);
        if self == HostOrder::Big {
            repr.reverse();
        }
        self.interpret_u32(repr)
    }

    /// Caller guarantees `buf.remaining() >= 8`
    pub fn get_u64<B: Buf>(self, buf: &mut B) -> u64 {
        let mut repr = [0u8; 8];
        buf.copy_to_slice(&mut repr);
        if self == HostOrder::Big {
            repr.reverse();
        }
        self.interpret_u64(repr)
    }
}

impl Default for HostOrder {
    fn default() -> Self {
        Self::native()
    }
}

/// The fixed P2P header
///
/// `message_size` is derived from the body whenever a message is encoded and cannot be
/// set directly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct P2pHeader {
    pub session_id: u32,
    pub identifier: u32,
    pub offset: u64,
    /// 0 means the message is the whole transfer
    pub total_size: u64,
    message_size: u32,
    pub flags: u32,
    pub ack1: u32,
    pub ack2: u32,
    pub ack_total: u64,
}

impl P2pHeader {
    pub fn message_size(&self) -> u32 {
        self.message_size
    }

    /// Record the body length; an unset total size becomes the body length.
    pub(crate) fn size_for_body(&mut self, body_len: usize) {
        self.message_size = size_field(body_len);
        if self.total_size == 0 {
            self.total_size = u64::from(self.message_size);
        }
    }

    pub fn write<B: BufMut>(&self, buf: &mut B, host: HostOrder) {
        host.put_u32(buf, self.session_id);
        host.put_u32(buf, self.identifier);
        host.put_u64(buf, self.offset);
        host.put_u64(buf, self.total_size);
        host.put_u32(buf, self.message_size);
        host.put_u32(buf, self.flags);
        host.put_u32(buf, self.ack1);
        host.put_u32(buf, self.ack2);
        host.put_u64(buf, self.ack_total);
    }

    /// Caller guarantees `buf.remaining() >= HEADER_SIZE`
    pub fn read<B: Buf>(buf: &mut B, host: HostOrder) -> Self {
        Self {
            session_id: host.get_u32(buf),
            identifier: host.get_u32(buf),
            offset: host.get_u64(buf),
            total_size: host.get_u64(buf),
            message_size: host.get_u32(buf),
            flags: host.get_u32(buf),
            ack1: host.get_u32(buf),
            ack2: host.get_u32(buf),
            ack_total: host.get_u64(buf),
        }
    }
}
