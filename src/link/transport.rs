//! Transport abstraction — any topic-oriented message link.
//!
//! Concrete implementations:
//! - MQTT client to a LAN broker (ESP-IDF `esp-mqtt`)
//! - AWS IoT Core (same client, TLS + `$aws/things/...` topics)
//! - [`MemoryTransport`] for host tests
//!
//! The I/O task is generic over `Transport`, so adding a new link
//! requires zero changes to the command path. Publishes are
//! fire-and-forget: a failed publish is logged and dropped.

use std::collections::VecDeque;

/// Topic-oriented message transport.
pub trait Transport {
    /// Error type for this transport.
    type Error: core::fmt::Debug;

    /// Try to (re)establish the link. May block for a bounded time.
    fn connect(&mut self) -> Result<(), Self::Error>;

    fn is_connected(&self) -> bool;

    fn subscribe(&mut self, topic: &str) -> Result<(), Self::Error>;

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), Self::Error>;

    /// Next received message payload, if any (non-blocking).
    ///
    /// Callback-driven transports deliver straight into the
    /// [`Mailbox`](super::mailbox::Mailbox) and always return `None` here.
    fn read(&mut self, buf: &mut [u8]) -> Result<Option<usize>, Self::Error>;
}

// ───────────────────────────────────────────────────────────────
// In-memory transport
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryTransportError {
    NotConnected,
    Refused,
    BufferTooSmall,
}

/// Broker stand-in: records subscriptions and publishes, replays queued
/// inbound payloads, and can be told to refuse connections.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    connected: bool,
    pub refuse_connect: bool,
    pub connect_attempts: u32,
    pub subscriptions: Vec<String>,
    pub published: Vec<(String, String)>,
    pub inbound: VecDeque<Vec<u8>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a payload as if the broker delivered it on the command topic.
    pub fn deliver(&mut self, payload: &str) {
        self.inbound.push_back(payload.as_bytes().to_vec());
    }

    /// Simulate the broker dropping the connection.
    pub fn drop_link(&mut self) {
        self.connected = false;
    }

    /// Payloads published on `topic`, oldest first.
    pub fn published_on(&self, topic: &str) -> Vec<&str> {
        self.published
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, p)| p.as_str())
            .collect()
    }
}

impl Transport for MemoryTransport {
    type Error = MemoryTransportError;

    fn connect(&mut self) -> Result<(), Self::Error> {
        self.connect_attempts += 1;
        if self.refuse_connect {
            return Err(MemoryTransportError::Refused);
        }
        self.connected = true;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), Self::Error> {
        if !self.connected {
            return Err(MemoryTransportError::NotConnected);
        }
        self.subscriptions.push(topic.into());
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), Self::Error> {
        if !self.connected {
            return Err(MemoryTransportError::NotConnected);
        }
        self.published
            .push((topic.into(), String::from_utf8_lossy(payload).into_owned()));
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<Option<usize>, Self::Error> {
        if !self.connected {
            return Ok(None);
        }
        let Some(msg) = self.inbound.pop_front() else {
            return Ok(None);
        };
        let dst = buf
            .get_mut(..msg.len())
            .ok_or(MemoryTransportError::BufferTooSmall)?;
        dst.copy_from_slice(&msg);
        Ok(Some(msg.len()))
    }
}
