//! Osmo Firmware — Main Entry Point
//!
//! Hexagonal architecture with a single-owner control loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter   LogEventSink   NvsAdapter   Esp32Time       │
//! │  (ActuatorPort)    (EventSink)    (ConfigPort) (TimePort)      │
//! │  MqttTransport     HttpGateway    EspSystem    WifiAdapter     │
//! │  (Transport)       (reply slots)  (SystemPort)                 │
//! │  PushHub (WebSocket events)       sntp (clock for AWS TLS)     │
//! │                                                                │
//! │  ──────────── Mailbox (the only cross-task path) ──────────    │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              AppService (pure logic)                   │    │
//! │  │  PumpController · Command model · Status encoder       │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  LinkEngine (mailbox ↔ service) · Scheduler (periodic publish) │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use log::{info, warn};

use osmo::adapters::cert_store::CertStore;
use osmo::adapters::hardware;
use osmo::adapters::http::{self, HttpGateway};
use osmo::adapters::log_sink::LogEventSink;
use osmo::adapters::mqtt::MqttTransport;
use osmo::adapters::nvs::NvsAdapter;
use osmo::adapters::push::{self, PushHub};
use osmo::adapters::sntp;
use osmo::adapters::system::EspSystem;
use osmo::adapters::time::Esp32TimeAdapter;
use osmo::adapters::{device_id, wifi::WifiAdapter};
use osmo::app::ports::{PeriodicTask, SystemPort, TimePort};
use osmo::app::service::AppService;
use osmo::config::{self, DeviceConfig, NetworkConfig, TransportKind};
use osmo::link::engine::LinkEngine;
use osmo::link::io_task;
use osmo::link::mailbox::Mailbox;
use osmo::link::topics::Topics;
use osmo::scheduler::Scheduler;

/// Handles that must outlive the control loop.
#[derive(Default)]
struct LinkHandles {
    _io_thread: Option<std::thread::JoinHandle<()>>,
    _push_thread: Option<std::thread::JoinHandle<()>>,
    _http_server: Option<esp_idf_svc::http::server::EspHttpServer<'static>>,
    _sntp: Option<esp_idf_svc::sntp::EspSntp<'static>>,
}

/// Bring up the configured command link. Falls back to a publish-less
/// engine when the link cannot be started.
fn start_link(
    net: &NetworkConfig,
    unit_id: &str,
    mailbox: &Arc<Mailbox>,
    nvs_partition: &EspDefaultNvsPartition,
) -> Result<(LinkEngine, LinkHandles)> {
    let mut handles = LinkHandles::default();
    let engine = match net.transport {
        TransportKind::Mqtt | TransportKind::AwsIot => {
            let (topics, certs) = if net.transport == TransportKind::AwsIot {
                let certs = CertStore::new(nvs_partition.clone()).load_bundle();
                if certs.is_none() {
                    warn!("LINK | AWS IoT credentials missing, running without a link");
                    return Ok((LinkEngine::reply_only(mailbox.clone()), handles));
                }
                handles._sntp = Some(sntp::sync_clock()?);
                (Topics::for_aws(unit_id, &net.aws_thing_name), certs)
            } else {
                (Topics::for_unit(unit_id), None)
            };
            let transport = MqttTransport::start(net, &topics.commands, mailbox.clone(), certs)?;
            handles._io_thread = Some(io_task::spawn(
                transport,
                topics.clone(),
                mailbox.clone(),
                net.reconnect_delay_ms,
            )?);
            LinkEngine::new(mailbox.clone(), topics)
        }
        TransportKind::Http => {
            let hub = PushHub::shared();
            let gateway = HttpGateway::new(mailbox.clone(), unit_id);
            handles._http_server = Some(http::start(gateway, hub.clone(), net.http_port)?);
            handles._push_thread = Some(push::spawn(mailbox.clone(), hub)?);
            mailbox.set_connected(true);
            LinkEngine::new(mailbox.clone(), Topics::for_websocket())
        }
    };
    Ok((engine, handles))
}

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("Osmo v{}", env!("CARGO_PKG_VERSION"));

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs_partition = EspDefaultNvsPartition::take()?;

    // ── 2. Load config from NVS (or defaults) ─────────────────
    let (mut config, net) = match NvsAdapter::new() {
        Ok(nvs) => config::load_or_default(&nvs),
        Err(e) => {
            warn!("NVS init failed ({}), running with defaults", e);
            (DeviceConfig::default(), NetworkConfig::default())
        }
    };

    // ── 3. Device identity ────────────────────────────────────
    let mac = device_id::read_mac();
    config.unit_id = device_id::resolve_unit_id(&config.unit_id, &mac);
    info!("Unit ID: {}", config.unit_id);

    // ── 4. Outputs first, so every pump is off before anything else ──
    let mut hw = hardware::from_config(&config)?;
    let mut log_sink = LogEventSink::new();
    let mut app = AppService::new(&config);
    app.start(&mut hw, &mut log_sink);

    // ── 5. Network ────────────────────────────────────────────
    let mut wifi = WifiAdapter::new(peripherals.modem, sysloop, Some(nvs_partition.clone()))?;
    if let Err(e) = wifi.connect(&net) {
        warn!("WiFi unavailable ({}), pumps stay controllable once it returns", e);
    }

    let mailbox = Mailbox::shared();
    let (mut engine, _handles) = start_link(&net, &config.unit_id, &mailbox, &nvs_partition)?;

    // ── 6. Control loop ───────────────────────────────────────
    let clock = Esp32TimeAdapter::new();
    let mut system = EspSystem::new();
    let mut sched = Scheduler::new(&config, clock.uptime_ms());
    if net.transport == TransportKind::Http {
        // WebSocket clients get status pushes only.
        sched.set_task_enabled(PeriodicTask::Heartbeat, false);
    }
    let period = Duration::from_millis(u64::from(config.control_loop_interval_ms));

    info!("System ready. Entering control loop.");

    loop {
        let now = clock.uptime_ms();

        sched.poll(now, &mut engine);
        engine.poll(&mut app, now, &mut hw, &mut log_sink);
        app.tick(now, &mut hw, &mut log_sink);

        if app.restart_due(now) {
            system.restart();
        }

        std::thread::sleep(period);
    }
}
