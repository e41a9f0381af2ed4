// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! In-field firmware update over the sensorimotor bus.
//!
//! The runtime firmware acknowledges an `S` raw-data handshake and jumps here; from then on the
//! node speaks the single-packet protocol of [`package`] and hands each request to the
//! [`agent::UpdateAgent`]. Every request gets exactly one `Y`/`N` reply packet.

pub mod agent;
pub mod package;

use log::{debug, warn};

use crate::hw::{HalfDuplex, ProgramMemory, SerialPort};
use crate::protocol::sendbuffer::{SendBuffer, SEND_BUFFER_SIZE};

pub use agent::{page_checksum, UpdateAgent};
pub use package::{encode, PacketReceiver};

/// Erase/write granularity of an update, in bytes.
pub const PAGE_SIZE: usize = 128;

pub const CMD_START: u8 = b'S';
pub const CMD_IDENTIFY: u8 = b'I';
pub const CMD_WRITE: u8 = b'W';
pub const CMD_RESET: u8 = b'R';

pub const ACK: u8 = b'Y';
pub const NACK: u8 = b'N';

/// Word left in no-init RAM by the runtime firmware when it hands over for an update.
pub const UPDATE_MAGIC: u32 = 0xB007_10AD;

/// Why a request was refused.
#[derive(Debug, PartialEq, Eq)]
pub enum Error<E> {
    LengthMismatch,
    ChecksumMismatch { expected: u16, actual: u16 },
    SignatureMismatch,
    UnknownCommand(u8),
    Memory(E),
}

impl<E> From<E> for Error<E> {
    fn from(e: E) -> Self {
        Error::Memory(e)
    }
}

/// Result of one request.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reply {
    pub accepted: bool,
    /// The device must reset once the reply is out.
    pub reset: bool,
}

impl Reply {
    pub fn rejected() -> Self {
        Self {
            accepted: false,
            reset: false,
        }
    }

    #[inline]
    pub fn byte(&self) -> u8 {
        if self.accepted {
            ACK
        } else {
            NACK
        }
    }
}

/// Last reset, as reported by the reset controller.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetCause {
    PowerOn,
    Pin,
    Watchdog,
    Software,
    Other,
}

/// Whether the bootloader should keep control instead of starting the application.
///
/// It stays after a handshake from the runtime firmware, after a reset-button press, and
/// whenever there is nothing valid to start.
pub fn stay_in_bootloader(magic: u32, cause: ResetCause, application_present: bool) -> bool {
    magic == UPDATE_MAGIC || cause == ResetCause::Pin || !application_present
}

/// Whether `initial_sp`, the first word of a vector table, points into SRAM.
pub fn is_valid_stack_pointer(initial_sp: u32) -> bool {
    initial_sp & 0xFFF0_0000 == 0x2000_0000
}

/// Bootloader main loop state.
pub struct Bootloader<P, L, M> {
    port: P,
    line: L,
    id: u8,
    receiver: PacketReceiver,
    agent: UpdateAgent<M>,
    send: SendBuffer<SEND_BUFFER_SIZE>,
}

impl<P, L, M> Bootloader<P, L, M>
where
    P: SerialPort,
    L: HalfDuplex,
    M: ProgramMemory,
{
    pub fn new(port: P, line: L, id: u8, agent: UpdateAgent<M>) -> Self {
        Self {
            port,
            line,
            id,
            receiver: PacketReceiver::new(id),
            agent,
            send: SendBuffer::new(),
        }
    }

    /// Consume one waiting byte. Returns the reply once a complete request was handled.
    pub fn poll(&mut self) -> Option<Reply> {
        let byte = match self.port.read() {
            Ok(byte) => byte,
            Err(nb::Error::WouldBlock) => return None,
            Err(nb::Error::Other(e)) => {
                debug!("receive error {:?}", e);
                self.receiver.restart();
                return None;
            }
        };
        let packet = self.receiver.push(byte)?;
        let reply = self.agent.handle(packet);

        self.send.add_packaged(self.id, &[reply.byte()]);
        if let Err(e) = self.send.flush(&mut self.port, &mut self.line) {
            warn!("reply lost: {:?}", e);
        }
        Some(reply)
    }

    #[inline]
    pub fn agent(&self) -> &UpdateAgent<M> {
        &self.agent
    }

    #[inline]
    pub fn port(&mut self) -> &mut P {
        &mut self.port
    }
}
