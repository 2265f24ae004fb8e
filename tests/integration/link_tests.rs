//! End-to-end link tests: broker stand-in → I/O helpers → mailbox →
//! engine → service, and back out again.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::mock_hw::{MockHardware, RecordingSink};

use osmo::adapters::http::HttpGateway;
use osmo::adapters::push::{self, FrameSink, PushHub};
use osmo::app::ports::PeriodicTask;
use osmo::app::service::AppService;
use osmo::config::DeviceConfig;
use osmo::link::engine::LinkEngine;
use osmo::link::io_task::{self, LinkState};
use osmo::link::mailbox::{MAX_PAYLOAD_LEN, Mailbox};
use osmo::link::topics::Topics;
use osmo::link::transport::MemoryTransport;
use osmo::scheduler::Scheduler;
use serde_json::Value;

const UNIT: &str = "osmo_centro";

struct Rig {
    app: AppService,
    hw: MockHardware,
    sink: RecordingSink,
    broker: MemoryTransport,
    mailbox: Arc<Mailbox>,
    engine: LinkEngine,
    topics: Topics,
    link: LinkState,
}

impl Rig {
    fn new(topics: Topics) -> Self {
        let mut config = DeviceConfig::default();
        config.unit_id.push_str(UNIT).unwrap();
        let mut app = AppService::new(&config);
        let mut hw = MockHardware::new();
        let mut sink = RecordingSink::new();
        app.start(&mut hw, &mut sink);

        let mailbox = Mailbox::shared();
        let engine = LinkEngine::new(mailbox.clone(), topics.clone());
        let mut rig = Self {
            app,
            hw,
            sink,
            broker: MemoryTransport::new(),
            mailbox,
            engine,
            topics,
            link: LinkState::default(),
        };
        assert!(io_task::supervise(&mut rig.broker, &rig.topics, &rig.mailbox, &mut rig.link));
        rig
    }

    /// One pass of the I/O task and the control loop.
    fn cycle(&mut self, now_ms: u64) {
        let mut buf = [0u8; MAX_PAYLOAD_LEN];
        io_task::supervise(&mut self.broker, &self.topics, &self.mailbox, &mut self.link);
        io_task::pump_inbound(&mut self.broker, &self.mailbox, &mut buf);
        self.engine
            .poll(&mut self.app, now_ms, &mut self.hw, &mut self.sink);
        self.app.tick(now_ms, &mut self.hw, &mut self.sink);
        while let Some(msg) = self.mailbox.try_next_outbound() {
            io_task::deliver(&mut self.broker, &msg);
        }
    }

    fn last_on(&self, topic: &str) -> Value {
        let payload = self.broker.published_on(topic).pop().unwrap();
        serde_json::from_str(payload).unwrap()
    }
}

#[test]
fn mqtt_command_is_answered_on_response_topic() {
    let mut rig = Rig::new(Topics::for_unit(UNIT));
    assert_eq!(rig.broker.subscriptions, vec!["motete/director/commands/osmo_centro"]);

    rig.broker.deliver(
        r#"{"command_id":"m1","action":"activate_pump","params":{"pump_id":0},"timestamp":1}"#,
    );
    rig.cycle(0);

    let resp = rig.last_on("motete/osmo/osmo_centro/response");
    assert_eq!(resp["code"], 200);
    assert_eq!(resp["command_id"], "m1");
    assert!(rig.hw.pump_on(0));

    rig.cycle(2_000);
    assert!(!rig.hw.pump_on(0));
}

#[test]
fn get_status_publishes_status_and_config() {
    let mut rig = Rig::new(Topics::for_unit(UNIT));
    rig.broker
        .deliver(r#"{"command_id":"s1","action":"get_status","timestamp":0}"#);
    rig.cycle(100);

    let status = rig.last_on("motete/osmo/osmo_centro/status");
    assert_eq!(status["unit_id"], UNIT);
    assert_eq!(status["pumps"].as_object().unwrap().len(), 4);
    let config = rig.last_on("motete/osmo/osmo_centro/config");
    assert_eq!(config["pumps"]["1"]["cooldown_time"], 3_000);
}

#[test]
fn garbage_is_reported_on_errors_topic() {
    let mut rig = Rig::new(Topics::for_unit(UNIT));
    rig.broker.deliver("\u{1}\u{2}binary");
    rig.cycle(5);

    assert_eq!(rig.last_on("motete/osmo/osmo_centro/response")["code"], 400);
    assert_eq!(
        rig.last_on("motete/osmo/osmo_centro/errors")["error_type"],
        "parse_error"
    );
}

#[test]
fn aws_heartbeat_goes_to_shadow_topic() {
    let mut rig = Rig::new(Topics::for_aws(UNIT, "osmo-thing-7"));
    rig.broker
        .deliver(r#"{"command_id":"h","action":"heartbeat"}"#);
    rig.cycle(10);

    let shadow = rig.last_on("$aws/things/osmo-thing-7/shadow/update");
    let reported = &shadow["state"]["reported"];
    assert_eq!(reported["status"], "alive");
    assert_eq!(reported["mqtt_connected"], true);
    assert_eq!(reported["unit_id"], UNIT);
    assert!(rig.broker.published_on("motete/osmo/osmo_centro/heartbeat").is_empty());
}

#[test]
fn reconnect_resubscribes_and_offline_publishes_drop() {
    let mut rig = Rig::new(Topics::for_unit(UNIT));
    rig.broker.drop_link();
    rig.broker.refuse_connect = true;

    rig.broker
        .deliver(r#"{"command_id":"lost","action":"heartbeat"}"#);
    rig.cycle(0);
    assert!(!rig.mailbox.is_connected());
    assert!(rig.broker.published.is_empty());

    rig.broker.refuse_connect = false;
    rig.cycle(1_000);
    assert!(rig.mailbox.is_connected());
    assert_eq!(rig.broker.subscriptions.len(), 2);
    // The queued command survives the outage and is answered once back.
    assert_eq!(rig.last_on("motete/osmo/osmo_centro/response")["command_id"], "lost");
}

#[test]
fn scheduler_drives_periodic_publishes() {
    let mut rig = Rig::new(Topics::for_unit(UNIT));
    let config = DeviceConfig::default();
    let mut sched = Scheduler::new(&config, 0);

    for now in (0..=60_000).step_by(50) {
        sched.poll(now, &mut rig.engine);
        rig.cycle(now);
    }

    assert_eq!(rig.broker.published_on("motete/osmo/osmo_centro/status").len(), 6);
    assert_eq!(rig.broker.published_on("motete/osmo/osmo_centro/heartbeat").len(), 1);
}

#[test]
fn disabled_scheduler_publishes_nothing() {
    let mut rig = Rig::new(Topics::for_unit(UNIT));
    let mut sched = Scheduler::new(&DeviceConfig::default(), 0);
    sched.set_task_enabled(PeriodicTask::StatusPublish, false);
    sched.set_task_enabled(PeriodicTask::Heartbeat, false);

    for now in (0..=60_000).step_by(1_000) {
        sched.poll(now, &mut rig.engine);
        rig.cycle(now);
    }
    assert!(rig.broker.published.is_empty());
}

#[test]
fn inbound_burst_is_handled_across_polls() {
    let mut rig = Rig::new(Topics::for_unit(UNIT));
    for i in 0..6 {
        rig.broker
            .deliver(&format!(r#"{{"command_id":"b{i}","action":"heartbeat"}}"#));
    }
    let mut buf = [0u8; MAX_PAYLOAD_LEN];
    assert_eq!(io_task::pump_inbound(&mut rig.broker, &rig.mailbox, &mut buf), 6);

    assert_eq!(rig.engine.poll(&mut rig.app, 0, &mut rig.hw, &mut rig.sink), 4);
    assert_eq!(rig.engine.poll(&mut rig.app, 50, &mut rig.hw, &mut rig.sink), 2);
    assert_eq!(rig.engine.poll(&mut rig.app, 100, &mut rig.hw, &mut rig.sink), 0);
    assert_eq!(rig.app.commands_handled(), 6);
}

// ── HTTP ─────────────────────────────────────────────────────

/// Spawn a control loop thread serving `mailbox` until `polls` run out,
/// one poll per 10 ms of uptime. With `push` the engine queues WebSocket
/// events and the status interval runs every second.
fn serve(mailbox: Arc<Mailbox>, polls: usize, push: bool) -> std::thread::JoinHandle<AppService> {
    std::thread::spawn(move || {
        let mut config = DeviceConfig::default();
        config.unit_id.push_str(UNIT).unwrap();
        config.status_interval_ms = 1_000;
        let mut app = AppService::new(&config);
        let mut hw = MockHardware::new();
        let mut sink = RecordingSink::new();
        app.start(&mut hw, &mut sink);
        let mut engine = if push {
            LinkEngine::new(mailbox, Topics::for_websocket())
        } else {
            LinkEngine::reply_only(mailbox)
        };
        let mut sched = Scheduler::new(&config, 0);
        sched.set_task_enabled(PeriodicTask::Heartbeat, false);
        for i in 0..polls {
            let now = i as u64 * 10;
            sched.poll(now, &mut engine);
            engine.poll(&mut app, now, &mut hw, &mut sink);
            std::thread::sleep(Duration::from_millis(10));
        }
        app
    })
}

/// WebSocket client stand-in.
#[derive(Clone, Default)]
struct WsClient {
    frames: Arc<Mutex<Vec<Value>>>,
}

impl FrameSink for WsClient {
    fn send_text(&mut self, frame: &str) -> bool {
        self.frames.lock().unwrap().push(serde_json::from_str(frame).unwrap());
        true
    }
}

impl WsClient {
    fn events(&self, event: &str) -> Vec<Value> {
        self.frames
            .lock()
            .unwrap()
            .iter()
            .filter(|f| f["event"] == event)
            .map(|f| f["data"].clone())
            .collect()
    }
}

#[test]
fn http_command_round_trip() {
    let mailbox = Mailbox::shared();
    let loop_thread = serve(mailbox.clone(), 100, false);
    let gateway = HttpGateway::new(mailbox.clone(), UNIT);

    let reply = gateway.command(
        "/api/command/osmo_centro",
        br#"{"command_id":"w1","action":"activate_pump","params":{"pump_id":3}}"#,
    );
    assert_eq!(reply.status, 200);
    let body: Value = serde_json::from_str(&reply.body).unwrap();
    assert_eq!(body["code"], 200);
    assert_eq!(body["command_id"], "w1");

    let status = gateway.status();
    let body: Value = serde_json::from_str(&status.body).unwrap();
    assert_eq!(body["pumps"]["3"]["active"], true);

    let app = loop_thread.join().unwrap();
    assert!(app.controller().is_active(3).unwrap());
    // Reply-only engines never publish.
    assert!(mailbox.try_next_outbound().is_none());
}

#[test]
fn http_unit_pushes_status_and_command_responses() {
    let mailbox = Mailbox::shared();
    let hub = PushHub::shared();
    let client = WsClient::default();
    hub.add(1, client.clone());
    let loop_thread = serve(mailbox.clone(), 150, true);
    let gateway = HttpGateway::new(mailbox.clone(), UNIT);

    let reply = gateway.command(
        "/api/command/osmo_centro",
        br#"{"command_id":"w2","action":"activate_pump","params":{"pump_id":1}}"#,
    );
    assert_eq!(reply.status, 200);
    loop_thread.join().unwrap();
    push::forward_pending(&mailbox, &hub);

    let responses = client.events("command_response");
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0]["command_id"], "w2");
    assert_eq!(responses[0]["code"], 200);
    // 1.5 s of uptime with a 1 s status interval.
    let statuses = client.events("status");
    assert_eq!(statuses.len(), 1);
    assert_eq!(statuses[0]["unit_id"], UNIT);
    assert!(client.events("heartbeat").is_empty());
}

#[test]
fn http_rejects_oversized_body() {
    let mailbox = Mailbox::shared();
    let gateway = HttpGateway::new(mailbox.clone(), UNIT);
    let body = vec![b' '; MAX_PAYLOAD_LEN + 1];
    let reply = gateway.command("/api/command/osmo_centro", &body);
    assert_eq!(reply.status, 400);
    let body: Value = serde_json::from_str(&reply.body).unwrap();
    assert_eq!(body["message"], "payload too large");
    assert!(mailbox.try_recv().is_none());
}

#[test]
fn http_rejects_other_units_without_queueing() {
    let mailbox = Mailbox::shared();
    let gateway = HttpGateway::new(mailbox.clone(), UNIT);
    assert_eq!(gateway.command("/api/command/osmo_sur", b"{}").status, 404);
    assert_eq!(gateway.command("/api/command/osmo_centro", b"").status, 400);
    assert!(mailbox.try_recv().is_none());
}

#[test]
fn http_times_out_without_control_loop() {
    let mailbox = Mailbox::shared();
    let gateway =
        HttpGateway::new(mailbox, UNIT).with_timeout(Duration::from_millis(30));
    let reply = gateway.command(
        "/api/command/osmo_centro",
        br#"{"action":"heartbeat"}"#,
    );
    assert_eq!(reply.status, 503);
}
