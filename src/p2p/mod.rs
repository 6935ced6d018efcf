//! # P2P Binary Message Codec
//!
//! Encoding and decoding of the binary messages used for peer-to-peer transfers.
//! All routines are pure transforms: no I/O, no shared state, safe to call from any
//! number of threads.
//!
//! ## Formats
//! - **Standard**: `[Header(48)] [Body] [Footer(4)]`, relayed through the switchboard
//! - **Data**: standard layout with a non-zero footer, for raw transfer chunks
//! - **Direct connection**: `[Length(4)] [Header(48)] [Body]`, no footer
//! - **Handshake**: `[Marker(8)] [Length(4)] [Header(48)] [Body] [Guid(16)]`
//!
//! Every multi-byte field is little-endian on the wire.

pub mod data;
pub mod direct;
pub mod flags;
pub mod handshake;
pub mod message;
pub mod wire;

pub use data::DataChunker;
pub use direct::DirectCodec;
pub use handshake::{Guid, HandshakeMessage};
pub use message::{P2pMessage, WireMessage};
pub use wire::{HostOrder, P2pHeader};
