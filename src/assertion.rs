// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Fatal invariant checks.
//!
//! Framing errors are never fatal; they are counted and the frame is dropped. The codes here are
//! reserved for internal state corruption, where the bus can no longer be trusted to carry a
//! report off the device. [`stop`] records the code and panics; the firmware panic handler picks
//! the code up with [`last`] and blinks it on the status LEDs (see [`crate::hw::led`]).

use core::sync::atomic::{AtomicU8, Ordering};

/// Diagnostic codes, blinked LSB first.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Assertion {
    /// The dispatcher was handed an opcode that is not a command.
    ProcessCommand = 2,
    /// Address byte arrived without a selected opcode.
    WaitingForId = 3,
    /// Payload byte arrived for an opcode that takes none.
    WaitingForData = 4,
    /// Eating started without a selected opcode.
    EatingOthersData = 5,
    /// Response buffer overflow.
    BufferExceeded = 8,
    /// A byte was fed to a state that does not consume bytes.
    UnknownCommandState = 17,
    /// Half-synced flag still set when a message was finished.
    NoSyncInFinished = 55,
}

impl Assertion {
    #[inline]
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            2 => Some(Self::ProcessCommand),
            3 => Some(Self::WaitingForId),
            4 => Some(Self::WaitingForData),
            5 => Some(Self::EatingOthersData),
            8 => Some(Self::BufferExceeded),
            17 => Some(Self::UnknownCommandState),
            55 => Some(Self::NoSyncInFinished),
            _ => None,
        }
    }
}

static LAST: AtomicU8 = AtomicU8::new(0);

/// Halt on an internal invariant violation.
pub fn stop(code: Assertion) -> ! {
    LAST.store(code.code(), Ordering::SeqCst);
    panic!("assertion {:?} (code {})", code, code.code());
}

/// Check `condition`, halting with `code` when it does not hold.
#[inline]
pub fn check(condition: bool, code: Assertion) {
    if !condition {
        stop(code);
    }
}

/// Code recorded by the most recent [`stop`], if any.
pub fn last() -> Option<Assertion> {
    Assertion::from_code(LAST.load(Ordering::SeqCst))
}
