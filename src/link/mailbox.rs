//! Link inter-task mailbox.
//!
//! Uses `embassy-sync` bounded MPMC channels to bridge the transport
//! tasks (I/O thread, MQTT callback, HTTP handlers) with the synchronous
//! control loop, which is the only owner of the pump controller.
//!
//! ```text
//! ┌──────────────┐  InboundMessage   ┌──────────────┐
//! │  Transports  │──────────────────▶│ Control Loop  │
//! │ (any thread) │◀──────────────────│ (sync)        │
//! └──────────────┘  OutboundMessage  └──────────────┘
//!        ▲                                   │
//!        └──────── ReplySlot (HTTP) ─────────┘
//! ```
//!
//! One mailbox per link, shared through an `Arc` that transport closures
//! capture.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use heapless::Vec;
use log::warn;

/// Largest command or reply payload carried through the mailbox.
pub const MAX_PAYLOAD_LEN: usize = 1024;

pub const MAX_TOPIC_LEN: usize = 128;

pub type Payload = Vec<u8, MAX_PAYLOAD_LEN>;
pub type Topic = heapless::String<MAX_TOPIC_LEN>;

/// Where the answer to an inbound message goes.
pub type ReplySlot = Signal<CriticalSectionRawMutex, Payload>;

/// What a transport is asking the control loop for.
#[derive(Clone)]
pub enum Request {
    /// Run a command payload; the response is published on the response
    /// topic.
    Command,
    /// Run a command payload and answer through the slot.
    CommandWithReply(Arc<ReplySlot>),
    /// Answer the current status payload through the slot.
    Status(Arc<ReplySlot>),
}

/// Inbound message, delivered to the control loop.
pub struct InboundMessage {
    pub request: Request,
    pub payload: Payload,
}

/// Outbound publish from the control loop, delivered to the I/O task.
pub struct OutboundMessage {
    pub topic: Topic,
    pub payload: Payload,
}

/// Channel depth for inbound messages.
const INBOUND_DEPTH: usize = 8;

/// Channel depth for outbound publishes.
const OUTBOUND_DEPTH: usize = 16;

pub struct Mailbox {
    inbound: Channel<CriticalSectionRawMutex, InboundMessage, INBOUND_DEPTH>,
    outbound: Channel<CriticalSectionRawMutex, OutboundMessage, OUTBOUND_DEPTH>,
    connected: AtomicBool,
    dropped: AtomicU32,
}

impl Default for Mailbox {
    fn default() -> Self {
        Self::new()
    }
}

impl Mailbox {
    pub const fn new() -> Self {
        Self {
            inbound: Channel::new(),
            outbound: Channel::new(),
            connected: AtomicBool::new(false),
            dropped: AtomicU32::new(0),
        }
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    // ── Transport side ────────────────────────────────────────

    /// Hand a received payload to the control loop. Returns `false` if it
    /// was dropped (too large or mailbox full).
    pub fn post(&self, request: Request, data: &[u8]) -> bool {
        let Ok(payload) = Payload::from_slice(data) else {
            warn!("LINK | inbound payload too large ({} bytes), dropping", data.len());
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        };
        if self
            .inbound
            .try_send(InboundMessage { request, payload })
            .is_err()
        {
            warn!("LINK | inbound mailbox full, dropping message");
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        true
    }

    /// Shorthand for a command whose response is published.
    pub fn post_command(&self, data: &[u8]) -> bool {
        self.post(Request::Command, data)
    }

    /// Wait for the next publish. Wakes as soon as the control loop
    /// queues one.
    pub async fn next_outbound(&self) -> OutboundMessage {
        self.outbound.receive().await
    }

    pub fn try_next_outbound(&self) -> Option<OutboundMessage> {
        self.outbound.try_receive().ok()
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Relaxed);
    }

    // ── Control loop side ─────────────────────────────────────

    pub fn try_recv(&self) -> Option<InboundMessage> {
        self.inbound.try_receive().ok()
    }

    /// Queue a publish. Fire-and-forget: returns `false` and counts a drop
    /// when the payload or topic does not fit or the outbox is full.
    pub fn publish(&self, topic: &str, payload: &str) -> bool {
        let (Ok(topic), Ok(payload)) = (
            Topic::try_from(topic),
            Payload::from_slice(payload.as_bytes()),
        ) else {
            warn!("LINK | publish to {} too large, dropping", topic);
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        };
        if self
            .outbound
            .try_send(OutboundMessage { topic, payload })
            .is_err()
        {
            warn!("LINK | outbox full, dropping publish");
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        true
    }

    /// Whether the transport currently reports an established link.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    /// Messages dropped in either direction since boot.
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Answer a [`Request`] that carries a reply slot.
pub fn reply(slot: &ReplySlot, payload: &str) {
    match Payload::from_slice(payload.as_bytes()) {
        Ok(p) => slot.signal(p),
        Err(()) => {
            warn!("LINK | reply too large ({} bytes)", payload.len());
            slot.signal(Payload::new());
        }
    }
}
