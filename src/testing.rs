// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Host-side doubles for the hardware capabilities.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::convert::Infallible;
use std::rc::Rc;
use std::vec::Vec;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, OutputPin};

use crate::hw::{HalfDuplex, NvStore, ProgramMemory, SerialPort};
use crate::motor::{ExternalSensor, MotorCore, Vector3};
use crate::protocol::messages::checksum;

/// Wrap `body` (everything after the syncs) in syncs and a checksum.
pub fn frame(body: &[u8]) -> Vec<u8> {
    let mut bytes = std::vec![0xFF, 0xFF];
    bytes.extend_from_slice(body);
    bytes.push(checksum(&bytes));
    bytes
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PinEvent {
    Set(&'static str, bool),
    Delay(u32),
}

/// Shared, ordered record of pin writes and delays.
#[derive(Clone, Default)]
pub struct PinLog(Rc<RefCell<Vec<PinEvent>>>);

impl PinLog {
    pub fn events(&self) -> Vec<PinEvent> {
        self.0.borrow().clone()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }

    fn push(&self, event: PinEvent) {
        self.0.borrow_mut().push(event);
    }
}

pub struct RecordingPin {
    name: &'static str,
    log: PinLog,
}

impl RecordingPin {
    pub fn new(name: &'static str, log: &PinLog) -> Self {
        Self {
            name,
            log: log.clone(),
        }
    }
}

impl ErrorType for RecordingPin {
    type Error = Infallible;
}

impl OutputPin for RecordingPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.log.push(PinEvent::Set(self.name, false));
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.log.push(PinEvent::Set(self.name, true));
        Ok(())
    }
}

pub struct RecordingDelay {
    log: PinLog,
}

impl RecordingDelay {
    pub fn new(log: &PinLog) -> Self {
        Self { log: log.clone() }
    }
}

impl DelayNs for RecordingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.log.push(PinEvent::Delay(ns));
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum PortError {
    Framing,
    Closed,
}

/// Serial port fed from a queue, capturing everything written.
#[derive(Default)]
pub struct QueuePort {
    pub rx: VecDeque<Result<u8, PortError>>,
    pub tx: Vec<u8>,
    pub flushes: usize,
    pub closed: bool,
}

impl QueuePort {
    pub fn feed(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes.iter().copied().map(Ok));
    }

    pub fn take_tx(&mut self) -> Vec<u8> {
        core::mem::take(&mut self.tx)
    }
}

impl SerialPort for QueuePort {
    type Error = PortError;

    fn read(&mut self) -> nb::Result<u8, PortError> {
        match self.rx.pop_front() {
            Some(Ok(byte)) => Ok(byte),
            Some(Err(e)) => Err(nb::Error::Other(e)),
            None => Err(nb::Error::WouldBlock),
        }
    }

    fn write(&mut self, byte: u8) -> Result<(), PortError> {
        if self.closed {
            return Err(PortError::Closed);
        }
        self.tx.push(byte);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), PortError> {
        self.flushes += 1;
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineEvent {
    Send,
    Receive,
}

#[derive(Default)]
pub struct RecordingLine {
    pub events: Vec<LineEvent>,
}

impl HalfDuplex for RecordingLine {
    fn send_mode(&mut self) {
        self.events.push(LineEvent::Send);
    }

    fn receive_mode(&mut self) {
        self.events.push(LineEvent::Receive);
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct StoreFailure;

/// Erased non-volatile store.
pub struct RamStore {
    pub bytes: [u8; 8],
    pub writes: usize,
    pub fail: bool,
}

impl Default for RamStore {
    fn default() -> Self {
        Self {
            bytes: [0xFF; 8],
            writes: 0,
            fail: false,
        }
    }
}

impl RamStore {
    /// Store holding a programmed id.
    pub fn with_id(id: u8) -> Self {
        let mut store = Self::default();
        store.bytes[0] = id | crate::identity::ID_WRITTEN;
        store
    }
}

impl NvStore for RamStore {
    type Error = StoreFailure;

    fn read(&mut self, address: u16) -> u8 {
        self.bytes[address as usize]
    }

    fn update(&mut self, address: u16, value: u8) -> Result<(), StoreFailure> {
        if self.fail {
            return Err(StoreFailure);
        }
        if self.bytes[address as usize] != value {
            self.bytes[address as usize] = value;
            self.writes += 1;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FlashOp {
    Erase(u32),
    Fill(u32),
    Commit(u32),
    Wait,
    Execute,
    Critical,
}

#[derive(Debug, PartialEq, Eq)]
pub struct OutOfRange(pub u32);

/// Program memory backed by a byte vector starting at `base`.
pub struct RamFlash {
    pub base: u32,
    pub memory: Vec<u8>,
    pub ops: Vec<FlashOp>,
    /// Make every fill fail, after the erase went through.
    pub fail_fill: bool,
}

impl RamFlash {
    pub fn new(base: u32, size: usize) -> Self {
        Self {
            base,
            memory: std::vec![0xFF; size],
            ops: Vec::new(),
            fail_fill: false,
        }
    }

    fn range(&self, address: u32, len: usize) -> Result<core::ops::Range<usize>, OutOfRange> {
        let start = address
            .checked_sub(self.base)
            .ok_or(OutOfRange(address))? as usize;
        if start + len > self.memory.len() {
            return Err(OutOfRange(address));
        }
        Ok(start..start + len)
    }
}

impl ProgramMemory for RamFlash {
    type Error = OutOfRange;

    fn base_address(&self) -> u32 {
        self.base
    }

    fn erase_page(&mut self, address: u32) -> Result<(), OutOfRange> {
        let range = self.range(address, crate::boot::PAGE_SIZE)?;
        self.memory[range].fill(0xFF);
        self.ops.push(FlashOp::Erase(address));
        Ok(())
    }

    fn fill_page(&mut self, address: u32, page: &[u8]) -> Result<(), OutOfRange> {
        if self.fail_fill {
            return Err(OutOfRange(address));
        }
        let range = self.range(address, page.len())?;
        self.memory[range].copy_from_slice(page);
        self.ops.push(FlashOp::Fill(address));
        Ok(())
    }

    fn commit_page(&mut self, address: u32) -> Result<(), OutOfRange> {
        self.ops.push(FlashOp::Commit(address));
        Ok(())
    }

    fn wait_ready(&mut self) -> Result<(), OutOfRange> {
        self.ops.push(FlashOp::Wait);
        Ok(())
    }

    fn enable_execution(&mut self) {
        self.ops.push(FlashOp::Execute);
    }

    fn critical<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.ops.push(FlashOp::Critical);
        f(self)
    }
}

/// Motor core recording every command, with fixed telemetry.
pub struct TestCore {
    pub enabled: bool,
    pub power: u8,
    pub direction: bool,
    pub limit: u8,
    pub default_direction: bool,
    pub telemetry: [u16; 5],
}

impl Default for TestCore {
    fn default() -> Self {
        Self {
            enabled: false,
            power: 0,
            direction: false,
            limit: 0,
            default_direction: false,
            telemetry: [0x0123, 0x0456, 0x0789, 0x0ABC, 0x0DEF],
        }
    }
}

impl MotorCore for TestCore {
    fn enable(&mut self) {
        self.enabled = true;
    }

    fn disable(&mut self) {
        self.enabled = false;
    }

    fn set_target_power(&mut self, power: u8) {
        self.power = power;
    }

    fn set_target_direction(&mut self, forward: bool) {
        self.direction = forward;
    }

    fn set_power_limit(&mut self, limit: u8) {
        self.limit = limit;
    }

    fn set_default_direction(&mut self, inverted: bool) {
        self.default_direction = inverted;
    }

    fn position(&self) -> u16 {
        self.telemetry[0]
    }

    fn current(&self) -> u16 {
        self.telemetry[1]
    }

    fn velocity(&mut self) -> u16 {
        self.telemetry[2]
    }

    fn voltage_supply(&self) -> u16 {
        self.telemetry[3]
    }

    fn temperature(&self) -> u16 {
        self.telemetry[4]
    }
}

#[derive(Default)]
pub struct TestSensor {
    pub values: Vector3,
    pub restarts: usize,
}

impl ExternalSensor for TestSensor {
    fn restart(&mut self) {
        self.restarts += 1;
    }

    fn values(&self) -> Vector3 {
        self.values
    }
}
