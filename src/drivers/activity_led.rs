//! Activity indicator — short non-blocking flash per inbound message.
//!
//! The on-board LED is active-low. A flash lights it at `now` and the next
//! [`ActivityLed::update`] at or after `now + ACTIVITY_FLASH_MS` turns it
//! off again; the control loop never sleeps for it.

use embedded_hal::digital::{OutputPin, PinState};

use crate::pins::ACTIVITY_FLASH_MS;

pub struct ActivityLed<P> {
    pin: P,
    active_low: bool,
    lit_until: Option<u64>,
}

impl<P: OutputPin> ActivityLed<P> {
    pub fn new(pin: P, active_low: bool) -> Result<Self, P::Error> {
        let mut led = Self {
            pin,
            active_low,
            lit_until: None,
        };
        led.write(false)?;
        Ok(led)
    }

    /// Light the LED; a flash already in progress is extended.
    pub fn flash(&mut self, now_ms: u64) -> Result<(), P::Error> {
        self.write(true)?;
        self.lit_until = Some(now_ms + ACTIVITY_FLASH_MS);
        Ok(())
    }

    pub fn update(&mut self, now_ms: u64) -> Result<(), P::Error> {
        match self.lit_until {
            Some(until) if now_ms >= until => {
                self.lit_until = None;
                self.write(false)
            }
            _ => Ok(()),
        }
    }

    pub fn is_lit(&self) -> bool {
        self.lit_until.is_some()
    }

    fn write(&mut self, lit: bool) -> Result<(), P::Error> {
        self.pin.set_state(PinState::from(lit != self.active_low))
    }
}
