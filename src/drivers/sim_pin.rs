//! In-memory output pin for host builds and tests.

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, OutputPin};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimPin {
    gpio: i32,
    high: bool,
    writes: u32,
}

impl SimPin {
    pub fn new(gpio: i32) -> Self {
        Self {
            gpio,
            high: false,
            writes: 0,
        }
    }

    pub fn gpio(&self) -> i32 {
        self.gpio
    }

    pub fn is_high(&self) -> bool {
        self.high
    }

    /// Level changes requested since creation.
    pub fn writes(&self) -> u32 {
        self.writes
    }
}

impl ErrorType for SimPin {
    type Error = Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.high = false;
        self.writes += 1;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.high = true;
        self.writes += 1;
        Ok(())
    }
}
