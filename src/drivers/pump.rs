//! Pump output driver (MOSFET low-side switch).
//!
//! A pump is a binary load: one digital output, on or off. Polarity is a
//! board property (`outputs_active_low`), so callers only ever say
//! "on"/"off".
//!
//! ## Safety contract
//!
//! This driver is a dumb actuator. Activation windows and cooldowns are
//! enforced by the [`PumpController`](crate::pumps::PumpController).

use embedded_hal::digital::{OutputPin, PinState};

pub struct PumpOutput<P> {
    pin: P,
    active_low: bool,
    on: bool,
}

impl<P: OutputPin> PumpOutput<P> {
    /// Wrap `pin` and drive it to the off level immediately.
    pub fn new(pin: P, active_low: bool) -> Result<Self, P::Error> {
        let mut out = Self {
            pin,
            active_low,
            on: true,
        };
        out.set(false)?;
        Ok(out)
    }

    pub fn set(&mut self, on: bool) -> Result<(), P::Error> {
        let high = on != self.active_low;
        self.pin.set_state(PinState::from(high))?;
        self.on = on;
        Ok(())
    }

    pub fn is_on(&self) -> bool {
        self.on
    }

    pub fn pin(&self) -> &P {
        &self.pin
    }
}
