// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! RS-485 transceiver direction control.
//!
//! The transceiver has an active-high driver enable and an active-low receiver enable. Both are
//! switched together so that the node never hears its own transmission, with short settling
//! delays around each turnaround.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use super::HalfDuplex;

/// Delay before switching to send, in ns.
pub const PRE_SEND_NS: u32 = 50;
/// Driver settling time after switching to send, in ns.
pub const POST_SEND_NS: u32 = 1_000;
/// Delay before switching to receive, in ns.
pub const PRE_RECEIVE_NS: u32 = 1_000;
/// Receiver settling time after switching to receive, in ns.
pub const POST_RECEIVE_NS: u32 = 70;

pub struct Rs485<DE, RE, D> {
    drive_enable: DE,
    read_disable: RE,
    delay: D,
}

impl<DE: OutputPin, RE: OutputPin, D: DelayNs> Rs485<DE, RE, D> {
    /// Wrap the direction pins, starting in receive mode.
    pub fn new(drive_enable: DE, read_disable: RE, delay: D) -> Self {
        let mut line = Self {
            drive_enable,
            read_disable,
            delay,
        };
        line.drive_enable.set_low().ok();
        line.read_disable.set_low().ok();
        line
    }

    pub fn free(self) -> (DE, RE, D) {
        (self.drive_enable, self.read_disable, self.delay)
    }
}

impl<DE: OutputPin, RE: OutputPin, D: DelayNs> HalfDuplex for Rs485<DE, RE, D> {
    fn send_mode(&mut self) {
        self.delay.delay_ns(PRE_SEND_NS);
        self.read_disable.set_high().ok();
        self.drive_enable.set_high().ok();
        self.delay.delay_ns(POST_SEND_NS);
    }

    fn receive_mode(&mut self) {
        // Wait out the last stop bit before dropping the driver.
        self.delay.delay_ns(PRE_RECEIVE_NS);
        self.drive_enable.set_low().ok();
        self.read_disable.set_low().ok();
        self.delay.delay_ns(POST_RECEIVE_NS);
    }
}
