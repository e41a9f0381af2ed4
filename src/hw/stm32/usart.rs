// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! USART wrappers.
//!
//! [`BusPort`] is the RS-485 bus side: non-blocking reads, blocking writes. [`Usart`] is the
//! transmit-only debug terminal behind the logger.
//!
//! To access the debug terminal on the host machine, connect the debug header to a USB serial
//! adapter and use
//! ```text
//! $ screen /dev/tty.usbserial* 115200
//! ```
//!
//! To close the debug terminal, press `Ctrl+A` then `Ctrl+\` then `y`.

use core::fmt;
use nb::block;

use stm32f7xx_hal::{
    prelude::*,
    serial::{self, Instance, Pins, Rx, Serial, Tx},
};

use crate::hw::SerialPort;

/// Bus UART, both directions.
pub struct BusPort<U: Instance> {
    tx: Tx<U>,
    rx: Rx<U>,
}

impl<U: Instance> BusPort<U> {
    pub fn new<PINS: Pins<U>>(serial: Serial<U, PINS>) -> Self {
        let (tx, rx) = serial.split();
        Self { tx, rx }
    }
}

impl<U: Instance> SerialPort for BusPort<U> {
    type Error = serial::Error;

    #[inline]
    fn read(&mut self) -> nb::Result<u8, serial::Error> {
        self.rx.read()
    }

    #[inline]
    fn write(&mut self, byte: u8) -> Result<(), serial::Error> {
        // The transmitter cannot fail.
        block!(self.tx.write(byte)).map_err(|e| match e {})
    }

    /// Waits for transmission complete, not just an empty data register.
    #[inline]
    fn flush(&mut self) -> Result<(), serial::Error> {
        block!(self.tx.flush()).map_err(|e| match e {})
    }
}

/// Transmit-only debug terminal.
///
/// Note: When using `writeln!`, be sure to include `\r` (CR) in the format string to ensure correct
/// line endings on the terminal.
pub struct Usart<U: Instance> {
    tx: Tx<U>,
}

impl<U: Instance> Usart<U> {
    pub fn new<PINS: Pins<U>>(serial: Serial<U, PINS>) -> Self {
        let (tx, _rx) = serial.split();
        Self { tx }
    }

    #[inline]
    pub fn write_byte(&mut self, b: u8) {
        let _ = block!(self.tx.write(b));
    }

    pub fn write_str(&mut self, s: &str) {
        for &b in s.as_bytes() {
            self.write_byte(b);
        }
    }

    /// Block until the hardware TX FIFO/drain is flushed.
    #[inline]
    pub fn flush(&mut self) {
        let _ = block!(self.tx.flush());
    }
}

// Implement `core::fmt::Write` so we can use `write!` / `writeln!` on `Usart`.
impl<U: Instance> fmt::Write for Usart<U> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        Usart::write_str(self, s);
        Ok(())
    }
}
