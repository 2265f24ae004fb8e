//! Hardware adapter — bridges GPIO drivers to the domain port trait.
//!
//! Owns one [`PumpOutput`] per configured pump and the [`ActivityLed`],
//! exposing them through [`ActuatorPort`].  This is the only module in
//! the system that switches pump outputs.  On non-espidf targets the
//! pins are [`SimPin`]s.

use embedded_hal::digital::OutputPin;
use log::warn;

use crate::app::ports::ActuatorPort;
use crate::config::DeviceConfig;
use crate::drivers::activity_led::ActivityLed;
use crate::drivers::pump::PumpOutput;
use crate::drivers::sim_pin::SimPin;

/// Concrete adapter that combines all outputs behind [`ActuatorPort`].
pub struct HardwareAdapter<P> {
    pumps: Vec<PumpOutput<P>>,
    led: ActivityLed<P>,
}

impl<P: OutputPin> HardwareAdapter<P> {
    pub fn new(pumps: Vec<PumpOutput<P>>, led: ActivityLed<P>) -> Self {
        Self { pumps, led }
    }

    pub fn pump_outputs(&self) -> &[PumpOutput<P>] {
        &self.pumps
    }

    pub fn activity_led(&self) -> &ActivityLed<P> {
        &self.led
    }
}

impl HardwareAdapter<SimPin> {
    /// Host stand-in wired like `config`.
    pub fn simulated(config: &DeviceConfig) -> Self {
        let pumps = config
            .active_pins()
            .iter()
            .map(|&gpio| match PumpOutput::new(SimPin::new(gpio), config.outputs_active_low) {
                Ok(out) => out,
                Err(never) => match never {},
            })
            .collect();
        let led = match ActivityLed::new(SimPin::new(config.activity_led_pin), true) {
            Ok(led) => led,
            Err(never) => match never {},
        };
        Self::new(pumps, led)
    }
}

#[cfg(target_os = "espidf")]
pub use esp::{EspOutput, from_config};

#[cfg(target_os = "espidf")]
mod esp {
    use anyhow::Context;
    use esp_idf_svc::hal::gpio::{AnyOutputPin, Output, PinDriver};

    use super::HardwareAdapter;
    use crate::config::DeviceConfig;
    use crate::drivers::activity_led::ActivityLed;
    use crate::drivers::pump::PumpOutput;

    pub type EspOutput = PinDriver<'static, AnyOutputPin, Output>;

    fn output(gpio: i32) -> anyhow::Result<EspOutput> {
        // SAFETY: each GPIO number is claimed exactly once, here, from the
        // validated DeviceConfig; no other driver owns these pins.
        let pin = unsafe { AnyOutputPin::new(gpio) };
        PinDriver::output(pin).with_context(|| format!("GPIO{gpio} output init"))
    }

    /// Claim every configured pump pin plus the activity LED.
    pub fn from_config(config: &DeviceConfig) -> anyhow::Result<HardwareAdapter<EspOutput>> {
        let mut pumps = Vec::with_capacity(config.active_pins().len());
        for &gpio in config.active_pins() {
            let out = PumpOutput::new(output(gpio)?, config.outputs_active_low)
                .with_context(|| format!("pump GPIO{gpio} off"))?;
            pumps.push(out);
        }
        let led = ActivityLed::new(output(config.activity_led_pin)?, true)
            .context("activity LED off")?;
        Ok(HardwareAdapter::new(pumps, led))
    }
}

// ── ActuatorPort implementation ───────────────────────────────

impl<P: OutputPin> ActuatorPort for HardwareAdapter<P> {
    fn set_pump_output(&mut self, pump_id: usize, on: bool) {
        let Some(out) = self.pumps.get_mut(pump_id) else {
            warn!("HW | no output for pump {}", pump_id);
            return;
        };
        if let Err(e) = out.set(on) {
            warn!("HW | pump {} write failed: {:?}", pump_id, e);
        }
    }

    fn all_off(&mut self) {
        for (id, out) in self.pumps.iter_mut().enumerate() {
            if let Err(e) = out.set(false) {
                warn!("HW | pump {} off failed: {:?}", id, e);
            }
        }
    }

    fn flash_activity(&mut self, now_ms: u64) {
        if let Err(e) = self.led.flash(now_ms) {
            warn!("HW | activity LED write failed: {:?}", e);
        }
    }

    fn update_indicators(&mut self, now_ms: u64) {
        if let Err(e) = self.led.update(now_ms) {
            warn!("HW | activity LED write failed: {:?}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulated_follows_config() {
        let hw = HardwareAdapter::simulated(&DeviceConfig::default());
        let gpios: Vec<i32> = hw.pump_outputs().iter().map(|o| o.pin().gpio()).collect();
        assert_eq!(gpios, vec![12, 13, 14, 15]);
        assert!(hw.pump_outputs().iter().all(|o| !o.is_on()));
    }

    #[test]
    fn port_switches_outputs() {
        let mut hw = HardwareAdapter::simulated(&DeviceConfig::default());
        hw.set_pump_output(2, true);
        assert!(hw.pump_outputs()[2].is_on());
        assert!(hw.pump_outputs()[2].pin().is_high());
        hw.all_off();
        assert!(!hw.pump_outputs()[2].is_on());
    }

    #[test]
    fn unknown_pump_is_ignored() {
        let mut hw = HardwareAdapter::simulated(&DeviceConfig::default());
        hw.set_pump_output(7, true);
        assert!(hw.pump_outputs().iter().all(|o| !o.is_on()));
    }

    #[test]
    fn activity_flash_expires() {
        let mut hw = HardwareAdapter::simulated(&DeviceConfig::default());
        hw.flash_activity(500);
        assert!(hw.activity_led().is_lit());
        hw.update_indicators(600);
        assert!(!hw.activity_led().is_lit());
    }
}
