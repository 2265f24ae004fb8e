//! WebSocket status push for HTTP units.
//!
//! HTTP units run their [`LinkEngine`](crate::link::engine::LinkEngine)
//! with [`Topics::for_websocket`](crate::link::topics::Topics::for_websocket),
//! so status snapshots, config, errors and `command_response` payloads land
//! in the mailbox outbox under their event name. The push task drains the
//! outbox and broadcasts each message as a `{event, data}` text frame to
//! every connected client.
//!
//! ```text
//!  control loop ──publish──▶ outbox ──next_outbound()──▶ push task ──▶ PushHub ──▶ clients
//! ```
//!
//! Frames are discarded while no client is connected, so the outbox never
//! backs up.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, info, warn};

use crate::link::mailbox::{Mailbox, OutboundMessage};
use crate::status;

/// Most WebSocket clients served at once.
pub const MAX_CLIENTS: usize = 4;

const PUSH_STACK_SIZE: usize = 8 * 1024;

/// Send side of one connected client.
pub trait FrameSink: Send {
    /// Send a text frame. `false` means the client is gone.
    fn send_text(&mut self, frame: &str) -> bool;
}

/// Connected clients, keyed by server session id.
pub struct PushHub<S> {
    clients: Mutex<Vec<(i32, S)>>,
}

impl<S: FrameSink> Default for PushHub<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: FrameSink> PushHub<S> {
    pub fn new() -> Self {
        Self {
            clients: Mutex::new(Vec::new()),
        }
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Register client `session`. Refused once [`MAX_CLIENTS`] are
    /// connected.
    pub fn add(&self, session: i32, sink: S) -> bool {
        let mut clients = self.lock();
        clients.retain(|(s, _)| *s != session);
        if clients.len() >= MAX_CLIENTS {
            warn!("WS | client limit reached, refusing session {}", session);
            return false;
        }
        clients.push((session, sink));
        info!("WS | session {} joined ({} connected)", session, clients.len());
        true
    }

    pub fn remove(&self, session: i32) {
        let mut clients = self.lock();
        clients.retain(|(s, _)| *s != session);
        info!("WS | session {} left ({} connected)", session, clients.len());
    }

    pub fn client_count(&self) -> usize {
        self.lock().len()
    }

    /// Send `frame` to every client and forget the ones that fail.
    /// Returns how many received it.
    pub fn broadcast(&self, frame: &str) -> usize {
        let mut clients = self.lock();
        let before = clients.len();
        clients.retain_mut(|(_, sink)| sink.send_text(frame));
        if clients.len() < before {
            debug!("WS | {} unreachable client(s) removed", before - clients.len());
        }
        clients.len()
    }

    // A panic inside a sink cannot corrupt the client list itself.
    fn lock(&self) -> MutexGuard<'_, Vec<(i32, S)>> {
        self.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Broadcast one outbound message. Returns the number of clients reached.
pub fn forward<S: FrameSink>(hub: &PushHub<S>, msg: &OutboundMessage) -> usize {
    let payload = String::from_utf8_lossy(&msg.payload);
    hub.broadcast(&status::push_frame(&msg.topic, &payload))
}

/// Forward everything already queued, without waiting. Returns how many
/// messages left the outbox.
pub fn forward_pending<S: FrameSink>(mailbox: &Mailbox, hub: &PushHub<S>) -> usize {
    let mut n = 0;
    while let Some(msg) = mailbox.try_next_outbound() {
        forward(hub, &msg);
        n += 1;
    }
    n
}

async fn push_loop<S: FrameSink>(mailbox: Arc<Mailbox>, hub: Arc<PushHub<S>>) {
    loop {
        let msg = mailbox.next_outbound().await;
        forward(&hub, &msg);
    }
}

/// Spawn the push task in a dedicated thread. It wakes as soon as the
/// control loop queues a message.
pub fn spawn<S: FrameSink + 'static>(
    mailbox: Arc<Mailbox>,
    hub: Arc<PushHub<S>>,
) -> std::io::Result<std::thread::JoinHandle<()>> {
    std::thread::Builder::new()
        .name("ws-push".into())
        .stack_size(PUSH_STACK_SIZE)
        .spawn(move || futures_lite::future::block_on(push_loop(mailbox, hub)))
}
