//! # MSNP Wire
//!
//! Stream de-framing and binary message codecs for the MSN messenger protocol.
//!
//! Two independent components form the core:
//! - [`core`]: the notification-server pool that cuts a raw, arbitrarily chunked
//!   socket stream into complete command blocks, including commands followed by a
//!   payload of declared length
//! - [`p2p`]: the binary P2P message codec with its standard, data,
//!   direct-connection and handshake formats
//!
//! ```text
//! socket bytes -> NsMessagePool::feed -> block -> (command parser)
//!                                          |
//!                           P2pMessage::decode <- payload body
//! P2pMessage::encode -> bytes -> socket write
//! ```
//!
//! Neither component performs I/O of its own. Connection handling, command parsing and
//! session logic are left to the caller; the [`NsCodec`] and [`DirectCodec`] adapters
//! plug the components into `tokio_util::codec::Framed`.

pub mod config;
pub mod core;
pub mod error;
pub mod p2p;
pub mod utils;

pub use crate::core::codec::NsCodec;
pub use crate::core::pool::{CommandSet, MessagePool, NsMessagePool, PayloadCommands};
pub use config::WireConfig;
pub use error::{ProtocolError, Result};
pub use p2p::{DirectCodec, Guid, HandshakeMessage, HostOrder, P2pHeader, P2pMessage, WireMessage};
