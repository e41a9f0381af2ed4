// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! STM32F777 bindings for the capability traits in [`crate::hw`].

pub mod adc;
pub mod bridge;
pub mod flash;
pub mod logger;
pub mod pins;
pub mod system;
pub mod usart;

use core::convert::Infallible;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, OutputPin};
use stm32f7xx_hal::gpio::{self, Output, PushPull};

pub use adc::TelemetryAdc;
pub use bridge::Drv8873Bridge;
pub use flash::{Flash, FlashError};
pub use pins::BoardPins;
pub use usart::{BusPort, Usart};

/// Reported to the update tool: DBGMCU device id 0x451 followed by the F777 line.
pub const DEVICE_SIGNATURE: [u8; 3] = [0x04, 0x51, 0x77];

/// Push-pull output usable wherever an `OutputPin` is expected.
pub struct PushPullPin<const P: char, const N: u8> {
    pin: gpio::Pin<P, N, Output<PushPull>>,
}

impl<const P: char, const N: u8> PushPullPin<P, N> {
    pub fn new(pin: gpio::Pin<P, N, Output<PushPull>>) -> Self {
        Self { pin }
    }

    pub fn free(self) -> gpio::Pin<P, N, Output<PushPull>> {
        self.pin
    }
}

impl<const P: char, const N: u8> ErrorType for PushPullPin<P, N> {
    type Error = Infallible;
}

impl<const P: char, const N: u8> OutputPin for PushPullPin<P, N> {
    #[inline]
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.pin.set_low();
        Ok(())
    }

    #[inline]
    fn set_high(&mut self) -> Result<(), Infallible> {
        self.pin.set_high();
        Ok(())
    }
}

/// Busy-wait delay calibrated against the core clock.
#[derive(Clone, Copy)]
pub struct CycleDelay {
    sysclk_hz: u32,
}

impl CycleDelay {
    pub fn new(sysclk_hz: u32) -> Self {
        Self { sysclk_hz }
    }
}

impl DelayNs for CycleDelay {
    fn delay_ns(&mut self, ns: u32) {
        let cycles = (ns as u64 * self.sysclk_hz as u64).div_ceil(1_000_000_000);
        cortex_m::asm::delay(cycles.max(1) as u32);
    }
}
