// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Status LEDs.
//!
//! The red LED marks time spent in the motor cycle; the yellow LED is free for the application.
//! After a fatal assertion both are used to blink the diagnostic code.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

/// Whether the LED is driven active-high or active-low on the board wiring.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ActiveLevel {
    High,
    Low,
}

/// LED abstraction that remembers its active level and last known state.
pub struct Led<PIN: OutputPin> {
    pin: PIN,
    active: ActiveLevel,
    is_on: bool,
}

impl<PIN: OutputPin> Led<PIN> {
    /// Create an LED wrapper, initializing it to OFF.
    pub fn new(pin: PIN, active: ActiveLevel) -> Self {
        let mut led = Self {
            pin,
            active,
            is_on: true,
        };
        led.off();
        led
    }

    pub fn active_high(pin: PIN) -> Self {
        Self::new(pin, ActiveLevel::High)
    }

    pub fn active_low(pin: PIN) -> Self {
        Self::new(pin, ActiveLevel::Low)
    }

    /// Drive the LED logically ON (true) or OFF (false).
    pub fn set(&mut self, on: bool) {
        let high = on == (self.active == ActiveLevel::High);
        if high {
            self.pin.set_high().ok();
        } else {
            self.pin.set_low().ok();
        }
        self.is_on = on;
    }

    #[inline]
    pub fn on(&mut self) {
        self.set(true);
    }

    #[inline]
    pub fn off(&mut self) {
        self.set(false);
    }

    pub fn toggle(&mut self) {
        self.set(!self.is_on);
    }

    #[inline]
    pub fn is_on(&self) -> bool {
        self.is_on
    }
}

/// Half period of one blinked bit, in ms.
pub const BLINK_PHASE_MS: u32 = 250;

/// The red/yellow pair on the sensorimotor board.
pub struct StatusLeds<R: OutputPin, Y: OutputPin> {
    pub red: Led<R>,
    pub yellow: Led<Y>,
}

impl<R: OutputPin, Y: OutputPin> StatusLeds<R, Y> {
    pub fn new(red: Led<R>, yellow: Led<Y>) -> Self {
        Self { red, yellow }
    }

    /// Blink `code` once, LSB first.
    ///
    /// Every bit is one red pulse; the yellow LED is lit alongside it when the bit is set. A
    /// dark gap of four phases separates repetitions.
    pub fn blink_code(&mut self, code: u8, delay: &mut impl DelayNs) {
        for bit in 0..8 {
            self.red.on();
            self.yellow.set(code & (1 << bit) != 0);
            delay.delay_ms(BLINK_PHASE_MS);
            self.red.off();
            self.yellow.off();
            delay.delay_ms(BLINK_PHASE_MS);
        }
        delay.delay_ms(4 * BLINK_PHASE_MS);
    }
}
