//! Embedded HTTP command link.
//!
//! | Route                        | Answer                                   |
//! |------------------------------|------------------------------------------|
//! | `GET /api/status`            | status payload                           |
//! | `POST /api/command/<unit>`   | response payload of the posted command   |
//! | `GET /ws` (WebSocket)        | pushed events, see [`push`](super::push) |
//!
//! Bodies over [`MAX_PAYLOAD_LEN`] are refused with 400 before they reach
//! the control loop.
//!
//! Handlers run on the HTTP server task. They never touch the pump
//! controller: each request is posted to the [`Mailbox`] with a reply
//! slot and the handler blocks until the control loop answers or
//! [`REPLY_TIMEOUT_MS`] passes.

use std::sync::Arc;
use std::time::Duration;

use log::warn;

use crate::command::ResponseCode;
use crate::link::mailbox::{MAX_PAYLOAD_LEN, Mailbox, Payload, ReplySlot, Request};
use crate::status;

/// Longest a handler waits for the control loop.
pub const REPLY_TIMEOUT_MS: u64 = 2_000;

const COMMAND_PREFIX: &str = "/api/command/";

/// What a handler writes back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    fn json(status: u16, body: String) -> Self {
        Self { status, body }
    }

    fn error(code: ResponseCode, error_type: &str, message: &str, unit_id: &str) -> Self {
        Self::json(code.as_u16(), status::error_payload(error_type, message, 0, unit_id))
    }
}

/// Unit id from a `/api/command/<unit>[?query]` URI.
pub fn command_unit(uri: &str) -> Option<&str> {
    let rest = uri.strip_prefix(COMMAND_PREFIX)?;
    let unit = rest.split(['?', '/']).next().unwrap_or_default();
    if unit.is_empty() { None } else { Some(unit) }
}

/// Block the calling task until `slot` is signalled or `timeout` passes.
pub fn await_reply(slot: &ReplySlot, timeout: Duration) -> Option<Payload> {
    futures_lite::future::block_on(futures_lite::future::or(
        async { Some(slot.wait().await) },
        async {
            async_io_mini::Timer::after(timeout).await;
            None
        },
    ))
}

/// Route logic shared by the ESP-IDF handlers and host tests.
pub struct HttpGateway {
    mailbox: Arc<Mailbox>,
    unit_id: String,
    timeout: Duration,
}

impl HttpGateway {
    pub fn new(mailbox: Arc<Mailbox>, unit_id: &str) -> Self {
        Self {
            mailbox,
            unit_id: unit_id.to_string(),
            timeout: Duration::from_millis(REPLY_TIMEOUT_MS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// `GET /api/status`.
    pub fn status(&self) -> HttpReply {
        self.round_trip(Request::Status, b"")
    }

    /// `POST /api/command/<unit>` with `body`.
    pub fn command(&self, uri: &str, body: &[u8]) -> HttpReply {
        match command_unit(uri) {
            Some(unit) if unit == self.unit_id => {}
            _ => {
                return HttpReply::error(
                    ResponseCode::NotFound,
                    "not_found",
                    "unknown unit",
                    &self.unit_id,
                );
            }
        }
        if body.is_empty() {
            return HttpReply::error(
                ResponseCode::BadRequest,
                "bad_request",
                "no body",
                &self.unit_id,
            );
        }
        if body.len() > MAX_PAYLOAD_LEN {
            warn!("HTTP | {}-byte body refused", body.len());
            return HttpReply::error(
                ResponseCode::BadRequest,
                "bad_request",
                "payload too large",
                &self.unit_id,
            );
        }
        self.round_trip(Request::CommandWithReply, body)
    }

    fn round_trip(&self, request: fn(Arc<ReplySlot>) -> Request, body: &[u8]) -> HttpReply {
        let slot = Arc::new(ReplySlot::new());
        if !self.mailbox.post(request(slot.clone()), body) {
            return HttpReply::error(
                ResponseCode::ServiceUnavailable,
                "busy",
                "command queue full",
                &self.unit_id,
            );
        }
        match await_reply(&slot, self.timeout) {
            Some(payload) => HttpReply::json(200, String::from_utf8_lossy(&payload).into_owned()),
            None => {
                warn!("HTTP | control loop did not answer in {:?}", self.timeout);
                HttpReply::error(
                    ResponseCode::ServiceUnavailable,
                    "timeout",
                    "no reply from control loop",
                    &self.unit_id,
                )
            }
        }
    }
}

#[cfg(target_os = "espidf")]
pub use esp::{WsHub, start};

#[cfg(target_os = "espidf")]
mod esp {
    use std::sync::Arc;

    use esp_idf_svc::http::Method;
    use esp_idf_svc::http::server::ws::{EspHttpWsConnection, EspHttpWsDetachedSender};
    use esp_idf_svc::http::server::{Configuration, EspHttpServer};
    use esp_idf_svc::io::{Read, Write};
    use esp_idf_svc::sys::EspError;
    use esp_idf_svc::ws::FrameType;
    use log::{debug, info, warn};

    use super::{HttpGateway, HttpReply};
    use crate::adapters::push::{FrameSink, PushHub};
    use crate::link::mailbox::MAX_PAYLOAD_LEN;

    pub type WsHub = PushHub<EspHttpWsDetachedSender>;

    impl FrameSink for EspHttpWsDetachedSender {
        fn send_text(&mut self, frame: &str) -> bool {
            self.send(FrameType::Text(false), frame.as_bytes()).is_ok()
        }
    }

    /// One WebSocket event. Inbound frames carry nothing the unit acts on.
    fn on_ws(ws: &mut EspHttpWsConnection, hub: &WsHub) -> Result<(), EspError> {
        let session = ws.session();
        if ws.is_new() {
            if !hub.add(session, ws.create_detached_sender()?) {
                ws.send(FrameType::Close, &[])?;
            }
            return Ok(());
        }
        if ws.is_closed() {
            hub.remove(session);
            return Ok(());
        }
        let (_, len) = ws.recv(&mut [])?;
        if len > MAX_PAYLOAD_LEN {
            warn!("WS | {}-byte frame from session {} refused", len, session);
            ws.send(FrameType::Close, &[])?;
            return Ok(());
        }
        let mut buf = vec![0u8; len];
        ws.recv(&mut buf)?;
        debug!("WS | {} bytes from session {} ignored", len, session);
        Ok(())
    }

    fn send(
        req: esp_idf_svc::http::server::Request<&mut esp_idf_svc::http::server::EspHttpConnection<'_>>,
        reply: HttpReply,
    ) -> anyhow::Result<()> {
        let headers = [("Content-Type", "application/json")];
        let mut resp = req.into_response(reply.status, None, &headers)?;
        resp.write_all(reply.body.as_bytes())?;
        Ok(())
    }

    /// Start the server on `port`, with WebSocket clients joining `hub`.
    /// Keep the returned handle alive.
    pub fn start(
        gateway: HttpGateway,
        hub: Arc<WsHub>,
        port: u16,
    ) -> anyhow::Result<EspHttpServer<'static>> {
        let cfg = Configuration {
            http_port: port,
            stack_size: 12 * 1024,
            uri_match_wildcard: true,
            ..Default::default()
        };
        let mut server = EspHttpServer::new(&cfg)?;
        let gateway = Arc::new(gateway);

        {
            let gateway = gateway.clone();
            server.fn_handler("/api/status", Method::Get, move |req| -> anyhow::Result<()> {
                send(req, gateway.status())
            })?;
        }

        server.ws_handler("/ws", move |ws: &mut EspHttpWsConnection| on_ws(ws, &hub))?;

        server.fn_handler("/api/command/*", Method::Post, move |mut req| -> anyhow::Result<()> {
            let uri = req.uri().to_string();
            // One byte past the limit is enough to tell an oversized body.
            let mut body = vec![0u8; MAX_PAYLOAD_LEN + 1];
            let mut len = 0;
            while len < body.len() {
                let n = req.read(&mut body[len..])?;
                if n == 0 {
                    break;
                }
                len += n;
            }
            send(req, gateway.command(&uri, &body[..len]))
        })?;

        info!("HTTP | server listening on port {}", port);
        Ok(server)
    }
}
