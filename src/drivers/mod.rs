//! GPIO-level actuator drivers.
//!
//! Drivers are generic over [`embedded_hal::digital::OutputPin`]. On
//! ESP-IDF they wrap `esp_idf_hal::gpio::PinDriver`; on host they wrap a
//! [`sim_pin::SimPin`].

pub mod activity_led;
pub mod pump;
pub mod sim_pin;
