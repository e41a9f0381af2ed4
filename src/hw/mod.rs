// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Hardware capabilities the protocol and bootloader are written against.
//!
//! The portable code never touches a register. It talks to a [`SerialPort`] for bus bytes, a
//! [`HalfDuplex`] line for transceiver turnaround, an [`NvStore`] for identity bytes, and a
//! [`ProgramMemory`] for application pages. Board bindings live in [`stm32`] behind the
//! `stm32f7` feature; host tests supply doubles.

use core::fmt::Debug;

pub mod led;
pub mod rs485;

#[cfg(feature = "stm32f7")]
pub mod stm32;

pub use led::{Led, StatusLeds};
pub use rs485::Rs485;

/// Failure while driving the bus.
#[derive(Debug, PartialEq, Eq)]
pub enum Error<E> {
    Serial(E),
}

impl<E> From<E> for Error<E> {
    fn from(e: E) -> Self {
        Error::Serial(e)
    }
}

/// Byte-oriented serial port.
pub trait SerialPort {
    type Error: Debug;

    /// Next received byte, or `WouldBlock` when none is waiting.
    fn read(&mut self) -> nb::Result<u8, Self::Error>;

    /// Queue one byte for transmission, blocking until it is accepted.
    fn write(&mut self, byte: u8) -> Result<(), Self::Error>;

    /// Block until the last byte has left the shift register.
    fn flush(&mut self) -> Result<(), Self::Error>;
}

/// Direction control of a half-duplex transceiver.
pub trait HalfDuplex {
    /// Claim the bus for transmission.
    fn send_mode(&mut self);

    /// Release the bus and listen again.
    fn receive_mode(&mut self);
}

/// Byte-addressed non-volatile store.
pub trait NvStore {
    type Error: Debug;

    fn read(&mut self, address: u16) -> u8;

    /// Write `value` at `address`. Implementations skip the write when the stored value
    /// already matches.
    fn update(&mut self, address: u16, value: u8) -> Result<(), Self::Error>;
}

/// Page-programmable application memory.
///
/// Pages are written in the order erase, fill, commit. Each step may leave the memory busy;
/// [`ProgramMemory::wait_ready`] blocks until it is idle again.
pub trait ProgramMemory {
    type Error: Debug;

    /// Address of the first application page.
    fn base_address(&self) -> u32;

    fn erase_page(&mut self, address: u32) -> Result<(), Self::Error>;

    fn fill_page(&mut self, address: u32, page: &[u8]) -> Result<(), Self::Error>;

    fn commit_page(&mut self, address: u32) -> Result<(), Self::Error>;

    fn wait_ready(&mut self) -> Result<(), Self::Error>;

    /// Make freshly written pages visible to instruction fetch.
    fn enable_execution(&mut self);

    /// Run `f` with interrupts masked.
    fn critical<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        f(self)
    }
}
