//! MQTT transport adapter (LAN broker and AWS IoT Core).
//!
//! Implements [`Transport`] over ESP-IDF's `esp-mqtt` client. The client
//! reconnects on its own (`reconnect_delay_ms`); its event callback
//! runs on the esp-mqtt task and posts complete command payloads straight
//! into the [`Mailbox`], so [`Transport::read`] never yields anything.
//!
//! The I/O task learns about reconnects through [`Session`]: every
//! `Connected` event starts a new session, which makes the transport
//! report "down" once so the command topic gets re-subscribed.
//!
//! AWS IoT uses the same client over `mqtts://` with the device
//! credentials from [`CertStore`](super::cert_store::CertStore). The
//! clock must already be set by [`sntp`](super::sntp) for the handshake.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

#[cfg(target_os = "espidf")]
pub use esp::{MqttError, MqttTransport};

/// Connection state shared between the client callback and the I/O task.
#[derive(Debug, Default)]
pub struct Session {
    connected: AtomicBool,
    epoch: AtomicU32,
}

impl Session {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Broker acknowledged a (re)connect.
    pub fn on_connected(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        self.connected.store(true, Ordering::Release);
    }

    pub fn on_disconnected(&self) {
        self.connected.store(false, Ordering::Release);
    }

    /// Up, and still the session last acknowledged by [`Self::accept`].
    pub fn is_current(&self, seen: u32) -> bool {
        self.connected.load(Ordering::Acquire) && self.epoch.load(Ordering::Acquire) == seen
    }

    /// Adopt the current session. Returns its epoch if the link is up.
    pub fn accept(&self) -> Option<u32> {
        if self.connected.load(Ordering::Acquire) {
            Some(self.epoch.load(Ordering::Acquire))
        } else {
            None
        }
    }
}

/// Map the configured QoS level (0-2) onto the wire level.
pub fn qos_level(qos: u8) -> u8 {
    qos.min(2)
}

#[cfg(target_os = "espidf")]
mod esp {
    use core::time::Duration;
    use std::sync::Arc;

    use esp_idf_svc::mqtt::client::{
        Details, EspMqttClient, EventPayload, MqttClientConfiguration, QoS,
    };
    use esp_idf_svc::sys::EspError;
    use esp_idf_svc::tls::X509;
    use log::{info, warn};

    use super::{Session, qos_level};
    use crate::adapters::cert_store::CertBundle;
    use crate::config::NetworkConfig;
    use crate::link::mailbox::{MAX_PAYLOAD_LEN, Mailbox};
    use crate::link::transport::Transport;

    #[derive(Debug)]
    pub enum MqttError {
        NotConnected,
        Client(EspError),
    }

    impl From<EspError> for MqttError {
        fn from(e: EspError) -> Self {
            Self::Client(e)
        }
    }

    pub struct MqttTransport {
        client: EspMqttClient<'static>,
        session: Arc<Session>,
        seen_epoch: u32,
        qos: QoS,
    }

    fn to_qos(level: u8) -> QoS {
        match qos_level(level) {
            0 => QoS::AtMostOnce,
            1 => QoS::AtLeastOnce,
            _ => QoS::ExactlyOnce,
        }
    }

    /// Leak a credential buffer; the client keeps it for its whole life.
    fn leak_pem(data: Vec<u8>) -> X509<'static> {
        X509::pem_until_nul(Box::leak(data.into_boxed_slice()))
    }

    fn non_empty(s: &str) -> Option<&str> {
        if s.is_empty() { None } else { Some(s) }
    }

    impl MqttTransport {
        /// Start the client. Command payloads arriving on `commands_topic`
        /// are posted to `mailbox`.
        ///
        /// `certs` must be present for AWS IoT Core.
        pub fn start(
            net: &NetworkConfig,
            commands_topic: &str,
            mailbox: Arc<Mailbox>,
            certs: Option<CertBundle>,
        ) -> anyhow::Result<Self> {
            let session = Session::shared();
            let mut conf = MqttClientConfiguration {
                client_id: non_empty(&net.client_id),
                username: non_empty(&net.username),
                password: non_empty(&net.password),
                keep_alive_interval: Some(Duration::from_secs(u64::from(net.keep_alive_secs))),
                reconnect_timeout: Some(Duration::from_millis(u64::from(net.reconnect_delay_ms))),
                disable_clean_session: !net.clean_session,
                ..Default::default()
            };
            if let Some(certs) = certs {
                conf.server_certificate = Some(leak_pem(certs.ca_cert));
                conf.client_certificate = Some(leak_pem(certs.device_cert));
                conf.private_key = Some(leak_pem(certs.private_key));
            }

            let cb_session = session.clone();
            let filter = commands_topic.to_string();
            let client = EspMqttClient::new_cb(&net.broker_url, &conf, move |event| {
                match event.payload() {
                    EventPayload::Connected(_) => {
                        info!("MQTT | connected");
                        cb_session.on_connected();
                    }
                    EventPayload::Disconnected => {
                        warn!("MQTT | disconnected");
                        cb_session.on_disconnected();
                    }
                    EventPayload::Received {
                        topic,
                        data,
                        details,
                        ..
                    } => {
                        // Fragmented payloads exceed the mailbox frame anyway.
                        if !matches!(details, Details::Complete) {
                            warn!("MQTT | fragmented payload dropped");
                            return;
                        }
                        if topic.is_some_and(|t| t != filter) {
                            return;
                        }
                        if data.len() > MAX_PAYLOAD_LEN {
                            warn!("MQTT | oversized payload ({} bytes) dropped", data.len());
                            return;
                        }
                        mailbox.post_command(data);
                    }
                    EventPayload::Error(e) => warn!("MQTT | client error: {:?}", e),
                    _ => {}
                }
            })?;
            info!("MQTT | client started for {}", net.broker_url);

            Ok(Self {
                client,
                session,
                seen_epoch: 0,
                qos: to_qos(net.qos),
            })
        }
    }

    impl Transport for MqttTransport {
        type Error = MqttError;

        /// The client reconnects by itself; this only adopts a new session.
        fn connect(&mut self) -> Result<(), MqttError> {
            match self.session.accept() {
                Some(epoch) => {
                    self.seen_epoch = epoch;
                    Ok(())
                }
                None => Err(MqttError::NotConnected),
            }
        }

        fn is_connected(&self) -> bool {
            self.session.is_current(self.seen_epoch)
        }

        fn subscribe(&mut self, topic: &str) -> Result<(), MqttError> {
            self.client.subscribe(topic, self.qos)?;
            Ok(())
        }

        fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), MqttError> {
            self.client.publish(topic, self.qos, false, payload)?;
            Ok(())
        }

        fn read(&mut self, _buf: &mut [u8]) -> Result<Option<usize>, MqttError> {
            Ok(None)
        }
    }
}
