// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! # Sensorimotor Firmware
//!
//! Bus stack for sensorimotor nodes: addressable motor controllers sharing one half-duplex
//! RS-485 line. Each node recognizes its own frames, skips foreign traffic without losing byte
//! alignment, answers only when addressed, and can be reprogrammed in the field over the same
//! bus. The code is `no_std` and hardware-agnostic; MCU bindings for the STM32F777 board sit
//! behind the `stm32f7` feature.
//!
//! ## Crate Structure
//!
//! | Module | Purpose |
//! | ------ | -------- |
//! | [`protocol`] | Frame parser, command dispatcher, response buffer, bus controller |
//! | [`boot`] | Firmware update packets and page-programming agent |
//! | [`motor`] | Motor core and external sensor collaborators |
//! | [`identity`] | Node id and default direction in non-volatile storage |
//! | [`hw`] | Hardware capability traits, RS-485 turnaround, LEDs, STM32F7 bindings |
//! | [`assertion`] | Fatal diagnostic codes |
//!
//! ## Getting Started
//!
//! Run the host tests:
//!
//! ```bash
//! cargo test
//! ```
//!
//! Flash the board (runtime firmware, then the bootloader):
//!
//! ```bash
//! cd firmware && cargo run --release
//! cd bootloader && cargo run --release
//! ```
//!
//! ## License
//!
//! Licensed under the **MIT License**.
//! See the `LICENSE` file in the repository root for full terms.
//!
//! © 2025–2026 Christopher Liu

#![no_std]

#[cfg(test)]
extern crate std;

pub mod assertion;
pub mod boot;
pub mod hw;
pub mod identity;
pub mod motor;
pub mod protocol;

#[cfg(test)]
mod testing;
