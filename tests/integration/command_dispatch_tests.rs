//! Integration tests for the payload → AppService → pumps pipeline.
//!
//! Every test feeds raw JSON through `handle_incoming_payload`, the same
//! entry point the transports use, and inspects the response payload.

use crate::mock_hw::{MockHardware, MockSystem, RecordingSink};

use osmo::app::events::{AppEvent, StopReason};
use osmo::app::ports::SystemPort;
use osmo::app::service::{AppService, RESTART_DELAY_MS};
use osmo::command::{Action, Command, PumpActivationParams, ResponseCode};
use osmo::config::DeviceConfig;
use serde_json::Value;

fn make_app() -> (AppService, MockHardware, RecordingSink) {
    let mut config = DeviceConfig::default();
    config.unit_id.push_str("osmo_norte").unwrap();
    let mut app = AppService::new(&config);
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();
    app.start(&mut hw, &mut sink);
    hw.clear();
    (app, hw, sink)
}

fn send(app: &mut AppService, hw: &mut MockHardware, sink: &mut RecordingSink, now: u64, raw: &str) -> Value {
    serde_json::from_str(&app.handle_incoming_payload(raw, now, hw, sink)).unwrap()
}

fn code(resp: &Value) -> u64 {
    resp["code"].as_u64().unwrap()
}

// ── Activation ───────────────────────────────────────────────

#[test]
fn activate_pump_switches_output_and_answers_200() {
    let (mut app, mut hw, mut sink) = make_app();
    let resp = send(
        &mut app,
        &mut hw,
        &mut sink,
        0,
        r#"{"command_id":"c1","action":"activate_pump","params":{"pump_id":1},"timestamp":0}"#,
    );
    assert_eq!(code(&resp), 200);
    assert_eq!(resp["success"], Value::Bool(true));
    assert_eq!(resp["command_id"], "c1");
    assert_eq!(resp["unit_id"], "osmo_norte");
    assert!(hw.pump_on(1));
    assert!(sink.events.contains(&AppEvent::PumpActivated {
        pump_id: 1,
        duration_ms: 2_000,
        forced: false
    }));
}

#[test]
fn busy_pump_answers_423() {
    let (mut app, mut hw, mut sink) = make_app();
    let raw = r#"{"command_id":"c","action":"activate_pump","params":{"pump_id":0}}"#;
    send(&mut app, &mut hw, &mut sink, 0, raw);
    let resp = send(&mut app, &mut hw, &mut sink, 500, raw);
    assert_eq!(code(&resp), 423);
    assert_eq!(resp["success"], Value::Bool(false));
}

#[test]
fn duration_override_runs_one_activation() {
    let (mut app, mut hw, mut sink) = make_app();
    send(
        &mut app,
        &mut hw,
        &mut sink,
        0,
        r#"{"command_id":"d","action":"activate_pump","params":{"pump_id":2,"duration":500}}"#,
    );
    assert_eq!(app.tick(500, &mut hw, &mut sink).as_slice(), &[2]);
    assert_eq!(
        sink.last(),
        Some(&AppEvent::PumpDeactivated {
            pump_id: 2,
            reason: StopReason::Expired
        })
    );
    assert_eq!(app.controller().pump(2).unwrap().timing().activation_ms, 2_000);
}

#[test]
fn duration_out_of_range_is_422() {
    let (mut app, mut hw, mut sink) = make_app();
    let resp = send(
        &mut app,
        &mut hw,
        &mut sink,
        0,
        r#"{"command_id":"d","action":"activate_pump","params":{"pump_id":2,"duration":99}}"#,
    );
    assert_eq!(code(&resp), 422);
    assert!(hw.calls.iter().all(|c| !matches!(c, crate::mock_hw::ActuatorCall::SetPump { .. })));
}

#[test]
fn missing_or_bad_pump_id_is_404() {
    let (mut app, mut hw, mut sink) = make_app();
    for raw in [
        r#"{"command_id":"x","action":"activate_pump","params":{}}"#,
        r#"{"command_id":"x","action":"activate_pump"}"#,
        r#"{"command_id":"x","action":"deactivate_pump","params":{"pump_id":4}}"#,
        r#"{"command_id":"x","action":"activate_pump","params":{"pump_id":-2}}"#,
    ] {
        assert_eq!(code(&send(&mut app, &mut hw, &mut sink, 0, raw)), 404, "{raw}");
    }
    assert_eq!(hw.pump_writes(), 0);
}

#[test]
fn non_integer_pump_id_is_400_and_huge_one_is_404() {
    let (mut app, mut hw, mut sink) = make_app();
    for raw in [
        r#"{"command_id":"x","action":"activate_pump","params":{"pump_id":"2"}}"#,
        r#"{"command_id":"x","action":"activate_pump","params":{"pump_id":1.5}}"#,
    ] {
        let resp = send(&mut app, &mut hw, &mut sink, 0, raw);
        assert_eq!(code(&resp), 400, "{raw}");
        assert_eq!(resp["message"], "pump_id must be an integer");
    }
    let raw = r#"{"command_id":"x","action":"deactivate_pump","params":{"pump_id":9999999999}}"#;
    assert_eq!(code(&send(&mut app, &mut hw, &mut sink, 0, raw)), 404);
    assert_eq!(hw.pump_writes(), 0);
    // A well-formed payload with a bad field is not a parse error.
    assert!(app.take_error_payload().is_none());
}

// ── Config below the floor ───────────────────────────

#[test]
fn set_pump_config_below_floor_is_422_without_mutation() {
    let (mut app, mut hw, mut sink) = make_app();
    let before = app.controller().pumps().to_vec();
    let resp = send(
        &mut app,
        &mut hw,
        &mut sink,
        0,
        r#"{"command_id":"s","action":"set_pump_config","params":{"pump_id":0,"activation_time":50,"cooldown_time":3000}}"#,
    );
    assert_eq!(code(&resp), 422);
    assert_eq!(app.controller().pumps(), before.as_slice());
    assert!(!app.take_config_publish());
}

#[test]
fn set_pump_config_requires_both_times() {
    let (mut app, mut hw, mut sink) = make_app();
    let resp = send(
        &mut app,
        &mut hw,
        &mut sink,
        0,
        r#"{"command_id":"s","action":"set_pump_config","params":{"pump_id":0,"activation_time":1500}}"#,
    );
    assert_eq!(code(&resp), 422);
}

#[test]
fn set_pump_config_queues_config_publish() {
    let (mut app, mut hw, mut sink) = make_app();
    let resp = send(
        &mut app,
        &mut hw,
        &mut sink,
        0,
        r#"{"command_id":"s","action":"set_pump_config","params":{"pump_id":3,"activation_time":1500,"cooldown_time":4000}}"#,
    );
    assert_eq!(code(&resp), 200);
    assert!(app.take_config_publish());
    let cfg: Value = serde_json::from_str(&app.config_payload()).unwrap();
    assert_eq!(cfg["pumps"]["3"]["activation_time"], 1500);
    assert_eq!(cfg["pumps"]["3"]["cooldown_time"], 4000);
    assert_eq!(cfg["pumps"]["0"]["activation_time"], 2000);
}

// ── Status snapshot ──────────────────────────────

#[test]
fn status_reflects_active_and_cooldown_pumps() {
    let (mut app, mut hw, mut sink) = make_app();
    let activate = |id: i32| {
        Command::with_params("a", Action::ActivatePump, &PumpActivationParams::pump(id), 0)
    };
    app.dispatch(&activate(3), 0, &mut hw, &mut sink);
    app.tick(2_000, &mut hw, &mut sink);
    app.dispatch(&activate(2), 2_500, &mut hw, &mut sink);

    let resp = app.dispatch(&Command::bare("g", Action::GetStatus, 2_600), 2_600, &mut hw, &mut sink);
    assert_eq!(resp.code, ResponseCode::Ok);
    assert!(app.take_status_request());
    assert!(app.take_config_publish());

    let status: Value = serde_json::from_str(&app.snapshot_status_payload(2_600)).unwrap();
    assert_eq!(status["status"], "ready");
    let pumps = &status["pumps"];
    assert_eq!(pumps["2"]["active"], true);
    assert_eq!(pumps["2"]["available"], false);
    assert_eq!(pumps["3"]["active"], false);
    assert_eq!(pumps["3"]["available"], false);
    assert_eq!(pumps["3"]["cooldown_remaining"], 2_400);
    for id in ["0", "1"] {
        assert_eq!(pumps[id]["active"], false);
        assert_eq!(pumps[id]["available"], true);
    }
}

// ── Unknown action ───────────────────────────────

#[test]
fn unknown_action_is_400() {
    let (mut app, mut hw, mut sink) = make_app();
    let resp = send(&mut app, &mut hw, &mut sink, 0, r#"{"command_id":"f","action":"foo"}"#);
    assert_eq!(code(&resp), 400);
    assert_eq!(resp["success"], Value::Bool(false));
    assert!(matches!(
        sink.last(),
        Some(AppEvent::CommandRejected { code: ResponseCode::BadRequest, .. })
    ));
    // A well-formed payload is not a parse error.
    assert!(app.take_error_payload().is_none());
}

#[test]
fn garbage_is_400_with_error_payload() {
    let (mut app, mut hw, mut sink) = make_app();
    let resp = send(&mut app, &mut hw, &mut sink, 42, "{not json");
    assert_eq!(code(&resp), 400);
    let err: Value = serde_json::from_str(&app.take_error_payload().unwrap()).unwrap();
    assert_eq!(err["error_type"], "parse_error");
    assert_eq!(err["timestamp"], 42);
    assert_eq!(err["unit_id"], "osmo_norte");
}

#[test]
fn every_inbound_payload_flashes_activity() {
    let (mut app, mut hw, mut sink) = make_app();
    send(&mut app, &mut hw, &mut sink, 0, "garbage");
    send(&mut app, &mut hw, &mut sink, 10, r#"{"action":"heartbeat"}"#);
    assert_eq!(hw.flashes(), 2);
}

// ── Device-level actions ─────────────────────────────────────

#[test]
fn reboot_answers_first_then_restarts_after_delay() {
    let (mut app, mut hw, mut sink) = make_app();
    let mut system = MockSystem::default();
    let resp = send(&mut app, &mut hw, &mut sink, 1_000, r#"{"command_id":"r","action":"reboot"}"#);
    assert_eq!(code(&resp), 200);
    assert!(app.restart_pending());

    for now in [1_000, 1_500, 1_999, 2_000] {
        if app.restart_due(now) {
            system.restart();
        }
    }
    assert_eq!(system.restarts, 1);
    assert_eq!(
        sink.last(),
        Some(&AppEvent::RestartScheduled { at_ms: 1_000 + RESTART_DELAY_MS })
    );
}

#[test]
fn reset_config_restores_defaults_and_stops_pumps() {
    let (mut app, mut hw, mut sink) = make_app();
    send(
        &mut app,
        &mut hw,
        &mut sink,
        0,
        r#"{"action":"set_pump_config","params":{"pump_id":1,"activation_time":9000,"cooldown_time":9000}}"#,
    );
    send(&mut app, &mut hw, &mut sink, 0, r#"{"action":"activate_pump","params":{"pump_id":1}}"#);
    assert!(hw.pump_on(1));

    let resp = send(&mut app, &mut hw, &mut sink, 100, r#"{"action":"reset_config"}"#);
    assert_eq!(code(&resp), 200);
    assert!(!hw.pump_on(1));
    assert!(app.controller().is_available(1, 100));
    assert_eq!(app.controller().pump(1).unwrap().timing().activation_ms, 2_000);
    assert_eq!(sink.last(), Some(&AppEvent::ConfigReset));
}

#[test]
fn heartbeat_requests_publish() {
    let (mut app, mut hw, mut sink) = make_app();
    let resp = send(&mut app, &mut hw, &mut sink, 0, r#"{"action":"heartbeat"}"#);
    assert_eq!(code(&resp), 200);
    assert!(app.take_heartbeat_request());
    assert!(!app.take_heartbeat_request());
}

#[test]
fn every_command_gets_exactly_one_response() {
    let (mut app, mut hw, mut sink) = make_app();
    let before = app.commands_handled();
    for raw in ["", "[]", r#"{"action":"get_status"}"#, r#"{"action":7}"#] {
        let resp = send(&mut app, &mut hw, &mut sink, 0, raw);
        assert!(resp["code"].is_u64());
    }
    assert_eq!(app.commands_handled(), before + 4);
}
