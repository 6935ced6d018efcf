//! # Notification Server Message Pool
//!
//! Buffers raw bytes read from a notification-server connection and releases them
//! as complete message blocks.
//!
//! A block is either a single command line terminated by `\n` (terminator kept), or a
//! payload command line followed by exactly the number of payload bytes the line
//! declares in its trailing integer field. Payload commands can be far larger than a
//! socket read, so a block may span any number of `feed` calls, and a single call may
//! complete any number of blocks.
//!
//! Which commands carry a payload is not known to the pool. It asks an injected
//! [`PayloadCommands`] predicate about the three-byte token at the start of each line.
//!
//! ## Example
//! ```rust
//! use msnp_wire::core::pool::{MessagePool, NsMessagePool};
//!
//! let mut pool = NsMessagePool::new();
//! pool.feed(b"MSG alice@example.com Alice 5\r\nhel");
//! assert!(!pool.has_message());
//!
//! pool.feed(b"loCHG 1 NLN\r\n");
//! assert_eq!(&pool.next_message().unwrap()[..], b"MSG alice@example.com Alice 5\r\nhello");
//! assert_eq!(&pool.next_message().unwrap()[..], b"CHG 1 NLN\r\n");
//! ```

use crate::config::{PoolConfig, DEFAULT_BUFFER_CAPACITY};
use crate::error::{ProtocolError, Result};
use bytes::{Bytes, BytesMut};
use std::collections::{HashSet, VecDeque};
use tracing::{debug, trace, warn};

/// Length of the command token at the start of every line
pub const TOKEN_LEN: usize = 3;

/// A source of complete protocol message blocks.
///
/// Implementations are single-owner: all calls into one pool must be serialized by the
/// caller, typically one pool per connection.
pub trait MessagePool {
    /// Append bytes read from the connection, completing zero or more blocks.
    fn feed(&mut self, data: &[u8]);

    /// Whether at least one completed block is queued.
    fn has_message(&self) -> bool;

    /// Dequeue the oldest completed block.
    ///
    /// # Errors
    /// Returns [`ProtocolError::EmptyQueue`] when no block has been completed.
    fn next_message(&mut self) -> Result<Bytes>;
}

/// Decides whether a command token is followed by a declared-length payload.
pub trait PayloadCommands {
    fn carries_payload(&self, token: &[u8]) -> bool;
}

impl<F> PayloadCommands for F
where
    F: Fn(&[u8]) -> bool,
{
    fn carries_payload(&self, token: &[u8]) -> bool {
        self(token)
    }
}

/// A closed set of payload command tokens, plus optional numeric error codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSet {
    commands: HashSet<[u8; TOKEN_LEN]>,
    numeric_codes: bool,
}

impl CommandSet {
    /// An empty set that recognizes no token at all
    pub fn empty() -> Self {
        Self {
            commands: HashSet::new(),
            numeric_codes: false,
        }
    }

    /// Build the set described by a pool configuration
    ///
    /// # Errors
    /// Returns [`ProtocolError::ConfigError`] if a configured command is not exactly
    /// three ASCII bytes.
    pub fn from_config(config: &PoolConfig) -> Result<Self> {
        let mut set = Self::empty().with_numeric_codes(config.numeric_codes_carry_payload);
        for command in &config.payload_commands {
            set.insert(command)?;
        }
        Ok(set)
    }

    /// Add a command token to the set
    pub fn insert(&mut self, command: &str) -> Result<()> {
        let token: [u8; TOKEN_LEN] = command
            .as_bytes()
            .try_into()
            .ok()
            .filter(|t: &[u8; TOKEN_LEN]| t.is_ascii())
            .ok_or_else(|| {
                ProtocolError::ConfigError(format!(
                    "Payload command must be 3 ASCII characters: '{command}'"
                ))
            })?;
        self.commands.insert(token);
        Ok(())
    }

    /// Builder form of [`insert`](Self::insert)
    pub fn with_command(mut self, command: &str) -> Result<Self> {
        self.insert(command)?;
        Ok(self)
    }

    /// Treat any three-digit numeric token as a payload command
    pub fn with_numeric_codes(mut self, enabled: bool) -> Self {
        self.numeric_codes = enabled;
        self
    }

    pub fn contains(&self, token: &[u8]) -> bool {
        <[u8; TOKEN_LEN]>::try_from(token)
            .map(|t| self.commands.contains(&t))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl Default for CommandSet {
    /// The notification-server payload commands, with numeric error codes enabled
    fn default() -> Self {
        let mut set = Self::empty().with_numeric_codes(true);
        for command in crate::config::DEFAULT_PAYLOAD_COMMANDS {
            set.commands.extend(<[u8; TOKEN_LEN]>::try_from(command.as_bytes()));
        }
        set
    }
}

impl PayloadCommands for CommandSet {
    fn carries_payload(&self, token: &[u8]) -> bool {
        self.contains(token) || (self.numeric_codes && is_numeric_code(token))
    }
}

/// `^[0-9]{3}$`
pub fn is_numeric_code(token: &[u8]) -> bool {
    token.len() == TOKEN_LEN && token.iter().all(u8::is_ascii_digit)
}

/// Outcome of scanning a line backwards for its length field
#[derive(Debug, PartialEq, Eq)]
enum DeclaredLength {
    Absent,
    Length(usize),
    Overflow,
}

/// Read the run of ASCII digits that ends a line (terminator already removed).
fn trailing_length(line: &[u8]) -> DeclaredLength {
    let digits = line
        .iter()
        .rev()
        .take_while(|b| b.is_ascii_digit())
        .count();
    if digits == 0 {
        return DeclaredLength::Absent;
    }

    line[line.len() - digits..]
        .iter()
        .try_fold(0usize, |acc, b| {
            acc.checked_mul(10)?.checked_add(usize::from(b - b'0'))
        })
        .map_or(DeclaredLength::Overflow, DeclaredLength::Length)
}

/// Strip `\n` and an immediately preceding `\r`
fn strip_terminator(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Stream demultiplexer for notification-server commands and payloads
#[derive(Debug)]
pub struct NsMessagePool<P = CommandSet> {
    commands: P,
    queue: VecDeque<Bytes>,
    buffer: BytesMut,
    remaining: usize,
    buffer_capacity: usize,
}

impl NsMessagePool<CommandSet> {
    /// Create a pool recognizing the default notification-server payload commands
    pub fn new() -> Self {
        Self::with_commands(CommandSet::default())
    }

    /// Create a pool from configuration
    pub fn from_config(config: &PoolConfig) -> Result<Self> {
        let mut pool = Self::with_commands(CommandSet::from_config(config)?);
        pool.buffer_capacity = config.initial_buffer_capacity.max(1);
        pool.buffer = BytesMut::with_capacity(pool.buffer_capacity);
        Ok(pool)
    }
}

impl Default for NsMessagePool<CommandSet> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: PayloadCommands> NsMessagePool<P> {
    /// Create a pool around any payload-command predicate
    pub fn with_commands(commands: P) -> Self {
        Self {
            commands,
            queue: VecDeque::new(),
            buffer: BytesMut::with_capacity(DEFAULT_BUFFER_CAPACITY),
            remaining: 0,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }

    pub fn commands(&self) -> &P {
        &self.commands
    }

    /// Number of completed blocks waiting to be dequeued
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Bytes accumulated for the block currently being assembled
    pub fn pending_bytes(&self) -> usize {
        self.buffer.len()
    }

    /// Payload bytes still expected before the current block completes
    pub fn remaining_payload(&self) -> usize {
        self.remaining
    }

    /// Dequeue every completed block, oldest first
    pub fn drain(&mut self) -> impl Iterator<Item = Bytes> + '_ {
        self.queue.drain(..)
    }

    /// Drop all queued and partially assembled data
    pub fn clear(&mut self) {
        self.queue.clear();
        self.buffer.clear();
        self.remaining = 0;
    }

    fn enqueue_current(&mut self) {
        let block = self.buffer.split().freeze();
        trace!(len = block.len(), queued = self.queue.len() + 1, "Block complete");
        self.queue.push_back(block);
        if self.buffer.capacity() < self.buffer_capacity {
            self.buffer.reserve(self.buffer_capacity);
        }
    }

    /// A full line (terminator included) is in the buffer.
    fn complete_line(&mut self) {
        let line = &self.buffer[..];
        if line.len() < TOKEN_LEN || !self.commands.carries_payload(&line[..TOKEN_LEN]) {
            self.enqueue_current();
            return;
        }

        // the token itself may be digits, only its arguments can declare a length
        let arguments = strip_terminator(line).get(TOKEN_LEN..).unwrap_or_default();
        match trailing_length(arguments) {
            DeclaredLength::Length(0) => self.enqueue_current(),
            DeclaredLength::Length(len) => {
                debug!(
                    command = %String::from_utf8_lossy(&line[..TOKEN_LEN]),
                    payload = len,
                    "Payload command, buffering body"
                );
                self.remaining = len;
            }
            DeclaredLength::Absent => {
                debug!(
                    command = %String::from_utf8_lossy(&line[..TOKEN_LEN]),
                    "Payload command without length field, treating line as complete"
                );
                self.enqueue_current();
            }
            DeclaredLength::Overflow => {
                warn!(
                    command = %String::from_utf8_lossy(&line[..TOKEN_LEN]),
                    "Payload length field overflows, treating line as complete"
                );
                self.enqueue_current();
            }
        }
    }
}

impl<P: PayloadCommands> MessagePool for NsMessagePool<P> {
    fn feed(&mut self, mut data: &[u8]) {
        while !data.is_empty() {
            if self.remaining > 0 {
                let take = self.remaining.min(data.len());
                self.buffer.extend_from_slice(&data[..take]);
                self.remaining -= take;
                data = &data[take..];

                if self.remaining == 0 {
                    self.enqueue_current();
                }
            } else if let Some(pos) = data.iter().position(|&b| b == b'\n') {
                self.buffer.extend_from_slice(&data[..=pos]);
                data = &data[pos + 1..];
                self.complete_line();
            } else {
                self.buffer.extend_from_slice(data);
                data = &[];
            }
        }
    }

    fn has_message(&self) -> bool {
        !self.queue.is_empty()
    }

    fn next_message(&mut self) -> Result<Bytes> {
        self.queue.pop_front().ok_or(ProtocolError::EmptyQueue)
    }
}
