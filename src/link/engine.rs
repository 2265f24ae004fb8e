//! Link engine — routes mailbox traffic through the [`AppService`].
//!
//! **Transport-decoupled**: the engine does not own a transport. It drains
//! inbound requests from the [`Mailbox`], runs them on the control loop
//! thread, and queues every resulting publish back into the mailbox for
//! the I/O task (MQTT) or the WebSocket push task (HTTP). HTTP requests
//! are also answered through their reply slot.
//!
//! Publishes produced per poll:
//!
//! | trigger                          | topic     | payload   |
//! |----------------------------------|-----------|-----------|
//! | any command                      | response  | response  |
//! | unparseable command              | errors    | error     |
//! | `get_status`, status interval    | status    | status    |
//! | `get_status`, config change      | config    | config    |
//! | `heartbeat`, heartbeat interval  | heartbeat | heartbeat |

use std::sync::Arc;

use log::{debug, info, warn};

use crate::app::ports::{ActuatorPort, EventSink, PeriodicTask, SchedulerDelegate};
use crate::app::service::AppService;
use crate::status;

use super::mailbox::{self, InboundMessage, Mailbox, Request};
use super::topics::Topics;

/// Upper bound on inbound messages handled per control loop iteration.
const MAX_INBOUND_PER_POLL: usize = 4;

pub struct LinkEngine {
    mailbox: Arc<Mailbox>,
    /// `None` for reply-only engines.
    topics: Option<Topics>,
    status_due: bool,
    heartbeat_due: bool,
    /// Mailbox drop count already logged.
    drops_seen: u32,
}

impl LinkEngine {
    /// Engine publishing on `topics`: broker topics, or WebSocket event
    /// names on HTTP units.
    pub fn new(mailbox: Arc<Mailbox>, topics: Topics) -> Self {
        Self {
            mailbox,
            topics: Some(topics),
            status_due: false,
            heartbeat_due: false,
            drops_seen: 0,
        }
    }

    /// Engine that only answers reply-slot requests and publishes nothing.
    pub fn reply_only(mailbox: Arc<Mailbox>) -> Self {
        Self {
            mailbox,
            topics: None,
            status_due: false,
            heartbeat_due: false,
            drops_seen: 0,
        }
    }

    /// Handle pending inbound requests, then queue every publish the
    /// service or the scheduler asked for. Returns the number of inbound
    /// messages handled.
    pub fn poll(
        &mut self,
        app: &mut AppService,
        now_ms: u64,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) -> usize {
        let mut n = 0;
        while n < MAX_INBOUND_PER_POLL {
            let Some(msg) = self.mailbox.try_recv() else {
                break;
            };
            self.handle(msg, app, now_ms, hw, sink);
            n += 1;
        }
        self.flush(app, now_ms);
        self.report_drops();
        n
    }

    fn handle(
        &mut self,
        msg: InboundMessage,
        app: &mut AppService,
        now_ms: u64,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) {
        let raw = String::from_utf8_lossy(&msg.payload);
        match msg.request {
            Request::Command => {
                let response = app.handle_incoming_payload(&raw, now_ms, hw, sink);
                self.publish_with(|t| &t.response, &response);
            }
            Request::CommandWithReply(slot) => {
                let response = app.handle_incoming_payload(&raw, now_ms, hw, sink);
                mailbox::reply(&slot, &response);
                self.publish_with(|t| &t.response, &response);
            }
            Request::Status(slot) => {
                mailbox::reply(&slot, &app.snapshot_status_payload(now_ms));
            }
        }
    }

    /// Queue the publishes requested since the last flush.
    fn flush(&mut self, app: &mut AppService, now_ms: u64) {
        if let Some(err) = app.take_error_payload() {
            self.publish_with(|t| &t.errors, &err);
        }
        if app.take_status_request() || core::mem::take(&mut self.status_due) {
            let payload = app.snapshot_status_payload(now_ms);
            if self.publish_with(|t| &t.status, &payload) {
                debug!("STATUS | published at {} ms", now_ms);
            }
        }
        if app.take_config_publish() {
            self.publish_with(|t| &t.config, &app.config_payload());
        }
        if app.take_heartbeat_request() || core::mem::take(&mut self.heartbeat_due) {
            self.publish_heartbeat(app.unit_id(), now_ms);
        }
    }

    fn publish_heartbeat(&self, unit_id: &str, now_ms: u64) {
        let Some(topics) = &self.topics else {
            return;
        };
        let connected = self.mailbox.is_connected();
        let payload = if topics.shadow_heartbeat {
            status::shadow_heartbeat_payload(unit_id, now_ms, connected)
        } else {
            status::heartbeat_payload(unit_id, now_ms, connected, self.mailbox.dropped())
        };
        if self.mailbox.publish(&topics.heartbeat, &payload) {
            info!("LINK | heartbeat queued");
        }
    }

    fn report_drops(&mut self) {
        let dropped = self.mailbox.dropped();
        if dropped > self.drops_seen {
            warn!(
                "LINK | {} message(s) dropped, {} since boot",
                dropped - self.drops_seen,
                dropped
            );
            self.drops_seen = dropped;
        }
    }

    /// Queue `payload` on the topic picked from [`Topics`]. No-op for
    /// reply-only engines.
    fn publish_with(&self, pick: impl Fn(&Topics) -> &super::mailbox::Topic, payload: &str) -> bool {
        match &self.topics {
            Some(topics) => self.mailbox.publish(pick(topics), payload),
            None => false,
        }
    }
}

impl SchedulerDelegate for LinkEngine {
    fn on_schedule_fired(&mut self, task: PeriodicTask) {
        match task {
            PeriodicTask::StatusPublish => self.status_due = true,
            PeriodicTask::Heartbeat => self.heartbeat_due = true,
        }
    }
}
