// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Runtime bus protocol.
//!
//! [`Communication`] owns everything on the node side of the bus: the frame parser, the response
//! buffer, the serial port, the transceiver line and the persistent identity. The main loop calls
//! [`Communication::step`] between control cycles; it never blocks on the bus.
//!
//! ```ignore
//! let mut com = Communication::new(port, line, store, Config::default());
//! loop {
//!     if timer.wrapped() {
//!         core.step(adc.sample());
//!     }
//!     if com.step(&mut core, &mut sensor) {
//!         // hand over to the bootloader
//!     }
//! }
//! ```

pub mod dispatcher;
pub mod messages;
pub mod parser;
pub mod sendbuffer;

use log::{debug, warn};

use crate::hw::{HalfDuplex, NvStore, SerialPort};
use crate::identity::Identity;
use crate::motor::{ExternalSensor, MotorCore};

pub use dispatcher::Outcome;
pub use messages::{Opcode, DEFAULT_ID, MAX_ID};
pub use parser::{Parser, State};
pub use sendbuffer::{SendBuffer, SEND_BUFFER_SIZE};

/// Run-time tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Node id used when the identity store was never programmed.
    pub default_id: u8,
    /// Idle service passes tolerated in the middle of a frame.
    pub watchdog_limit: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_id: DEFAULT_ID,
            watchdog_limit: 100,
        }
    }
}

pub struct Communication<P, L, S> {
    port: P,
    line: L,
    identity: Identity<S>,
    parser: Parser,
    send: SendBuffer<SEND_BUFFER_SIZE>,
    config: Config,
    errors: u16,
    idle: u16,
    halt: bool,
}

impl<P, L, S> Communication<P, L, S>
where
    P: SerialPort,
    L: HalfDuplex,
    S: NvStore,
{
    /// Load the identity from `store`, falling back to `config.default_id`.
    pub fn new(port: P, line: L, store: S, config: Config) -> Self {
        Self {
            port,
            line,
            identity: Identity::load(store, config.default_id),
            parser: Parser::new(),
            send: SendBuffer::new(),
            config,
            errors: 0,
            idle: 0,
            halt: false,
        }
    }

    /// Push the persisted configuration into the motor core.
    pub fn configure<C: MotorCore>(&self, core: &mut C) {
        core.set_default_direction(self.identity.default_direction());
    }

    /// Advance the state machine by one step.
    ///
    /// Consumes at most one byte. Returns `false` when nothing could be done because no byte
    /// was waiting.
    pub fn receive_command<C, E>(&mut self, core: &mut C, sensor: &mut E) -> bool
    where
        C: MotorCore,
        E: ExternalSensor,
    {
        match self.parser.state() {
            State::Pending => {
                let outcome = dispatcher::process(
                    self.parser.frame(),
                    &mut self.identity,
                    core,
                    sensor,
                    &mut self.send,
                );
                if outcome == Outcome::Halt {
                    self.halt = true;
                }
                self.parser.dispatched();
            }
            State::Finished => {
                if let Err(e) = self.send.flush(&mut self.port, &mut self.line) {
                    warn!("response lost: {:?}", e);
                }
                self.parser.reset();
                self.idle = 0;
            }
            State::Error => {
                self.errors = self.errors.saturating_add(1);
                debug!("frame dropped, {} errors", self.errors);
                self.send.discard();
                self.parser.discarded();
            }
            _ => match self.port.read() {
                Ok(byte) => {
                    self.idle = 0;
                    self.parser.feed(byte, self.identity.id());
                }
                Err(nb::Error::WouldBlock) => return false,
                Err(nb::Error::Other(e)) => {
                    debug!("receive error {:?} in {:?}", e, self.parser.state());
                    if self.parser.state() == State::Syncing {
                        return false;
                    }
                    self.parser.fail();
                }
            },
        }
        true
    }

    /// Service the bus until no byte is waiting, then run the inactivity watchdog.
    ///
    /// Returns `true` once the bootloader handshake was acknowledged.
    pub fn step<C, E>(&mut self, core: &mut C, sensor: &mut E) -> bool
    where
        C: MotorCore,
        E: ExternalSensor,
    {
        while self.receive_command(core, sensor) {}

        if self.parser.state() != State::Syncing {
            self.idle = self.idle.saturating_add(1);
            if self.idle > self.config.watchdog_limit {
                debug!("watchdog: frame stalled in {:?}", self.parser.state());
                self.parser.fail();
                while self.receive_command(core, sensor) {}
            }
        }
        self.halt
    }

    #[inline]
    pub fn state(&self) -> State {
        self.parser.state()
    }

    /// Framing errors seen since startup, saturating.
    #[inline]
    pub fn errors(&self) -> u16 {
        self.errors
    }

    #[inline]
    pub fn id(&self) -> u8 {
        self.identity.id()
    }

    #[inline]
    pub fn identity(&self) -> &Identity<S> {
        &self.identity
    }

    #[inline]
    pub fn port(&mut self) -> &mut P {
        &mut self.port
    }

    pub fn free(self) -> (P, L, Identity<S>) {
        (self.port, self.line, self.identity)
    }
}
