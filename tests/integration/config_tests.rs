//! Configuration loading, validation and persistence.

use crate::mock_hw::MockConfigStore;

use osmo::adapters::nvs::NvsAdapter;
use osmo::app::ports::{ConfigError, ConfigPort};
use osmo::app::service::AppService;
use osmo::config::{self, DeviceConfig, NetworkConfig, PumpTiming, TransportKind};

#[test]
fn corrupted_store_falls_back_to_defaults() {
    let store = MockConfigStore {
        device: Err(ConfigError::Corrupted),
    };
    let (device, network) = config::load_or_default(&store);
    assert_eq!(device, DeviceConfig::default());
    assert_eq!(network, NetworkConfig::default());
}

#[test]
fn out_of_range_record_falls_back_to_defaults() {
    let store = MockConfigStore {
        device: Err(ConfigError::ValidationFailed("pump_count must be 1–8")),
    };
    assert_eq!(config::load_or_default(&store).0, DeviceConfig::default());
}

#[test]
fn stored_config_shapes_the_service() {
    let nvs = NvsAdapter::new().unwrap();
    let mut cfg = DeviceConfig::default();
    cfg.unit_id.push_str("osmo_oeste").unwrap();
    cfg.pump_count = 2;
    cfg.pump_defaults = PumpTiming {
        activation_ms: 1_500,
        cooldown_ms: 4_000,
    };
    nvs.save(&cfg).unwrap();

    let (loaded, _) = config::load_or_default(&nvs);
    let app = AppService::new(&loaded);
    assert_eq!(app.unit_id(), "osmo_oeste");
    assert_eq!(app.controller().pump_count(), 2);
    assert_eq!(app.controller().defaults(), cfg.pump_defaults);
}

#[test]
fn service_validator_follows_pump_count() {
    let cfg = DeviceConfig {
        pump_count: 2,
        ..Default::default()
    };
    let mut app = AppService::new(&cfg);
    let mut hw = crate::mock_hw::MockHardware::new();
    let mut sink = crate::mock_hw::RecordingSink::new();
    let resp = app.handle_incoming_payload(
        r#"{"action":"activate_pump","params":{"pump_id":2}}"#,
        0,
        &mut hw,
        &mut sink,
    );
    assert!(resp.contains(r#""code":404"#));
}

#[test]
fn network_config_requires_broker_for_mqtt() {
    let mut net = NetworkConfig::default();
    assert!(net.validate().is_err());
    net.broker_url.push_str("mqtts://broker.local:8883").unwrap();
    assert!(net.validate().is_ok());

    net.transport = TransportKind::AwsIot;
    assert!(net.validate().is_err());
    net.aws_thing_name.push_str("osmo-thing").unwrap();
    assert!(net.validate().is_ok());
}

#[test]
fn provisioning_rejects_bad_network_config() {
    let nvs = NvsAdapter::new().unwrap();
    let net = NetworkConfig {
        qos: 3,
        transport: TransportKind::Http,
        ..Default::default()
    };
    assert!(matches!(
        nvs.save_network(&net),
        Err(ConfigError::ValidationFailed(_))
    ));
    assert_eq!(nvs.load_network().unwrap(), NetworkConfig::default());
}

#[test]
fn config_error_messages_name_the_problem() {
    let msg = ConfigError::ValidationFailed("qos must be 0–2").to_string();
    assert!(msg.contains("qos"));
}
