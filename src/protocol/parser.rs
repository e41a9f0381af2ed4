// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Byte-driven frame parser for the sensorimotor bus.
//!
//! The parser consumes exactly one byte per [`Parser::feed`] and never blocks. It only decides
//! what a frame is; acting on it (dispatching, flushing the response, counting errors) is left to
//! the owner, who moves the parser out of the non-consuming states `Pending`, `Finished` and
//! `Error` with [`Parser::dispatched`], [`Parser::reset`] and [`Parser::discarded`].
//!
//! Frames addressed to another node and responses from other nodes are recognized and skipped
//! byte for byte ("eaten") so that their payload can never be mistaken for a new frame.

use heapless::Vec;

use crate::assertion::{check, stop, Assertion};
use crate::protocol::messages::{Kind, Opcode, Payload, MAX_ID, SYNC_BYTE};

/// Largest payload a frame can carry.
pub const MAX_PAYLOAD: usize = 255;

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Syncing,
    Awaiting,
    GetAddress,
    Reading,
    Eating,
    Verifying,
    Pending,
    Finished,
    Error,
}

/// The frame assembled so far.
#[derive(Debug, Default)]
pub struct Frame {
    opcode: Option<Opcode>,
    direction: bool,
    address: u8,
    length: Option<u8>,
    payload: Vec<u8, MAX_PAYLOAD>,
}

impl Frame {
    #[inline]
    pub fn opcode(&self) -> Option<Opcode> {
        self.opcode
    }

    /// Low bit of the opcode byte, the motor direction of a set-voltage command.
    #[inline]
    pub fn direction(&self) -> bool {
        self.direction
    }

    #[inline]
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Payload bytes, without the length prefix of length-prefixed opcodes.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// First payload byte of single-argument commands.
    #[inline]
    pub fn arg(&self) -> u8 {
        self.payload.first().copied().unwrap_or(0)
    }
}

pub struct Parser {
    state: State,
    half_synced: bool,
    checksum: u8,
    eaten: u16,
    to_eat: Option<u16>,
    frame: Frame,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    pub fn new() -> Self {
        Self {
            state: State::Syncing,
            half_synced: false,
            checksum: 0,
            eaten: 0,
            to_eat: None,
            frame: Frame::default(),
        }
    }

    #[inline]
    pub fn state(&self) -> State {
        self.state
    }

    #[inline]
    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// Consume one byte. `own_id` is the address this node answers to.
    pub fn feed(&mut self, byte: u8, own_id: u8) {
        self.checksum = self.checksum.wrapping_add(byte);
        self.state = match self.state {
            State::Syncing => self.sync(byte),
            State::Awaiting => self.select(byte),
            State::GetAddress => self.address(byte, own_id),
            State::Reading => self.read(byte),
            State::Eating => self.eat(byte),
            State::Verifying => self.verify(),
            State::Pending | State::Finished | State::Error => {
                stop(Assertion::UnknownCommandState)
            }
        };
    }

    /// The pending frame was handled.
    pub fn dispatched(&mut self) {
        check(self.state == State::Pending, Assertion::UnknownCommandState);
        self.state = State::Finished;
    }

    /// Abort the current frame.
    pub fn fail(&mut self) {
        self.half_synced = false;
        self.state = State::Error;
    }

    /// The failed frame was accounted for.
    pub fn discarded(&mut self) {
        check(self.state == State::Error, Assertion::UnknownCommandState);
        self.state = State::Finished;
    }

    /// Clear per-message state and start looking for the next sync.
    pub fn reset(&mut self) {
        check(!self.half_synced, Assertion::NoSyncInFinished);
        self.checksum = 0;
        self.eaten = 0;
        self.to_eat = None;
        self.frame = Frame::default();
        self.state = State::Syncing;
    }

    fn sync(&mut self, byte: u8) -> State {
        if byte != SYNC_BYTE {
            self.half_synced = false;
            return State::Finished;
        }
        if self.half_synced {
            self.half_synced = false;
            State::Awaiting
        } else {
            self.half_synced = true;
            State::Syncing
        }
    }

    fn select(&mut self, byte: u8) -> State {
        // A longer sync run: the pair ends at this byte.
        if byte == SYNC_BYTE {
            self.checksum = SYNC_BYTE.wrapping_add(SYNC_BYTE);
            return State::Awaiting;
        }
        match Opcode::from_byte(byte) {
            Some(opcode) => {
                self.frame.opcode = Some(opcode);
                self.frame.direction = byte & 1 != 0;
                State::GetAddress
            }
            None => State::Finished,
        }
    }

    fn address(&mut self, byte: u8, own_id: u8) -> State {
        let Some(opcode) = self.frame.opcode else {
            stop(Assertion::WaitingForId)
        };
        if byte > MAX_ID {
            return State::Error;
        }
        self.frame.address = byte;

        if opcode.kind() == Kind::Response || byte != own_id {
            self.to_eat = match opcode.payload() {
                Payload::Fixed(n) => Some(n as u16 + 1),
                Payload::LengthPrefixed => None,
            };
            return State::Eating;
        }
        match opcode.payload() {
            Payload::Fixed(0) => State::Verifying,
            _ => State::Reading,
        }
    }

    fn read(&mut self, byte: u8) -> State {
        let Some(opcode) = self.frame.opcode else {
            stop(Assertion::WaitingForData)
        };
        let expected = match opcode.payload() {
            Payload::Fixed(0) => stop(Assertion::WaitingForData),
            Payload::Fixed(n) => {
                if opcode == Opcode::SetId && byte > MAX_ID {
                    return State::Error;
                }
                n
            }
            Payload::LengthPrefixed => match self.frame.length {
                Some(n) => n,
                None => {
                    self.frame.length = Some(byte);
                    return if byte == 0 {
                        State::Verifying
                    } else {
                        State::Reading
                    };
                }
            },
        };
        if self.frame.payload.push(byte).is_err() {
            stop(Assertion::BufferExceeded);
        }
        if self.frame.payload.len() < expected as usize {
            State::Reading
        } else {
            State::Verifying
        }
    }

    fn eat(&mut self, byte: u8) -> State {
        check(self.frame.opcode.is_some(), Assertion::EatingOthersData);
        // Length byte, the bytes it announces, checksum.
        let to_eat = *self.to_eat.get_or_insert(byte as u16 + 2);
        self.eaten += 1;
        if self.eaten < to_eat {
            State::Eating
        } else {
            State::Finished
        }
    }

    fn verify(&mut self) -> State {
        if self.checksum == 0 {
            State::Pending
        } else {
            State::Error
        }
    }
}
