//! Fuzz target: inbound command path
//!
//! Feeds arbitrary bytes through `parse_command` and the full
//! `AppService::handle_incoming_payload` pipeline, asserting that every
//! input is answered with exactly one well-formed response and that no
//! pump is left both active and available.
//!
//! cargo fuzz run fuzz_command_parser

#![no_main]

use libfuzzer_sys::fuzz_target;
use osmo::app::events::AppEvent;
use osmo::app::ports::{ActuatorPort, EventSink};
use osmo::app::service::AppService;
use osmo::command::{parse_command, serialize_command};
use osmo::config::DeviceConfig;

struct NoHw;

impl ActuatorPort for NoHw {
    fn set_pump_output(&mut self, _: usize, _: bool) {}
    fn all_off(&mut self) {}
    fn flash_activity(&mut self, _: u64) {}
    fn update_indicators(&mut self, _: u64) {}
}

struct NoSink;

impl EventSink for NoSink {
    fn emit(&mut self, _: &AppEvent) {}
}

fuzz_target!(|data: &[u8]| {
    let raw = String::from_utf8_lossy(data);

    let cmd = parse_command(&raw);
    if !cmd.is_parse_failure() {
        // Anything that parsed must survive a re-encode.
        assert_eq!(parse_command(&serialize_command(&cmd)).action, cmd.action);
    }

    let mut app = AppService::new(&DeviceConfig::default());
    app.start(&mut NoHw, &mut NoSink);
    let response = app.handle_incoming_payload(&raw, 0, &mut NoHw, &mut NoSink);
    let doc: serde_json::Value =
        serde_json::from_str(&response).expect("response must be valid JSON");
    assert!(doc["code"].is_u64(), "response must carry a numeric code");

    let pumps = app.controller();
    for id in 0..pumps.pump_count() {
        assert!(!(pumps.is_active(id).unwrap() && pumps.is_available(id, 0)));
    }
});
