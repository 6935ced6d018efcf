//! # Core Framing Components
//!
//! Turns the raw, arbitrarily chunked byte stream of a notification-server
//! connection into discrete message blocks.
//!
//! ## Components
//! - **Pool**: the stream demultiplexer and its payload-command predicate
//! - **Codec**: Tokio codec adapter over the pool
//!
//! ## Block Format
//! ```text
//! <TOK> <args...>\r\n                      plain command
//! <TOK> <args...> <N>\r\n<N payload bytes>  payload command
//! ```
//!
//! A malformed or absent length field never stalls the stream: the line is released
//! as a complete block.

pub mod codec;
pub mod pool;
