//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter      | Implements         | Connects to                  |
//! |--------------|--------------------|------------------------------|
//! | `hardware`   | ActuatorPort       | ESP32 GPIO pump outputs, LED |
//! | `log_sink`   | EventSink          | Serial log output            |
//! | `nvs`        | ConfigPort         | NVS / in-memory store        |
//! | `time`       | TimePort           | ESP32 system timer           |
//! | `system`     | SystemPort         | `esp_restart`                |
//! | `mqtt`       | Transport          | esp-mqtt (LAN / AWS IoT)     |
//! | `http`       | (reply slots)      | ESP-IDF HTTP server          |
//! | `push`       | —                  | WebSocket clients (HTTP)     |
//! | `sntp`       | —                  | NTP clock sync (AWS IoT TLS) |
//! | `cert_store` | —                  | AWS IoT credentials in NVS   |
//! | `wifi`       | —                  | ESP-IDF WiFi STA             |
//! | `device_id`  | —                  | Factory MAC                  |

pub mod cert_store;
pub mod device_id;
pub mod hardware;
pub mod http;
pub mod log_sink;
pub mod mqtt;
pub mod nvs;
pub mod push;
pub mod sntp;
pub mod system;
pub mod time;
pub mod wifi;
