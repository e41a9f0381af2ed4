// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! ADC1 sampling of the motor telemetry using direct PAC register access.
//!
//! Blocking single-channel conversions, one per input, once per control cycle.
//!
//! Example:
//! ```ignore
//! let mut adc = TelemetryAdc::new(dp.ADC1, pins.sense);
//! core.step(adc.sample());
//! ```

use stm32f7xx_hal::pac;

use super::pins::SensePins;
use crate::motor::Telemetry;

pub const CH_POSITION: u8 = 10;
pub const CH_SUPPLY: u8 = 11;
pub const CH_CURRENT: u8 = 14;
/// Internal temperature sensor.
pub const CH_TEMPERATURE: u8 = 18;

const VREF_MV: u32 = 3300;
const FULL_SCALE: u32 = 4095;
/// Sensor output at 25 °C and its slope, from the datasheet.
const V25_MV: i32 = 760;
const SLOPE_UV_PER_C: i32 = 2500;

pub struct TelemetryAdc {
    adc: pac::ADC1,
    _pins: SensePins,
}

impl TelemetryAdc {
    /// Create and initialize ADC1 with the temperature sensor enabled.
    pub fn new(adc1: pac::ADC1, pins: SensePins) -> Self {
        let rcc = unsafe { &*pac::RCC::ptr() };
        rcc.apb2enr.modify(|_, w| w.adc1en().set_bit());

        let common = unsafe { &*pac::ADC_COMMON::ptr() };
        // ADC prescaler: PCLK2 / 4, temperature sensor on
        common
            .ccr
            .modify(|_, w| w.adcpre().div4().tsvrefe().set_bit());

        // Power off to configure
        adc1.cr2.modify(|_, w| w.adon().clear_bit());

        // 12-bit, right-aligned, software trigger
        adc1.cr1.modify(|_, w| w.res().bits(0b00));
        adc1.cr2.modify(|_, w| {
            w.cont().clear_bit();
            w.align().right();
            w.exten().disabled();
            w
        });

        // 480 cycles on every channel we read. The temperature sensor needs at least 10 us.
        let smp = sample_time_bits(&[CH_POSITION, CH_SUPPLY, CH_CURRENT, CH_TEMPERATURE], 10);
        adc1.smpr1.write(|w| unsafe { w.bits(smp) });

        // Sequence length = 1 conversion
        adc1.sqr1.modify(|_, w| w.l().bits(0));

        adc1.cr2.modify(|_, w| w.adon().set_bit());

        Self { adc: adc1, _pins: pins }
    }

    /// Read a single channel.
    pub fn read(&mut self, channel: u8) -> u16 {
        self.adc
            .sqr3
            .modify(|_, w| unsafe { w.sq1().bits(channel & 0x1F) });

        self.adc.cr2.modify(|_, w| w.swstart().set_bit());

        while self.adc.sr.read().eoc().bit_is_clear() {}

        self.adc.dr.read().data().bits()
    }

    /// Convert every telemetry input.
    pub fn sample(&mut self) -> Telemetry {
        let position = self.read(CH_POSITION);
        let current = self.read(CH_CURRENT);
        let voltage_supply = self.read(CH_SUPPLY);
        let temperature = celsius(self.read(CH_TEMPERATURE));
        Telemetry {
            position,
            current,
            voltage_supply,
            temperature,
        }
    }

    #[inline]
    pub fn free(self) -> pac::ADC1 {
        self.adc
    }
}

/// SMPR bits selecting the longest sample time for `channels` at or above `first`.
const fn sample_time_bits(channels: &[u8], first: u8) -> u32 {
    let mut bits = 0;
    let mut i = 0;
    while i < channels.len() {
        let ch = channels[i];
        if ch >= first && ch < first + 10 {
            bits |= 0b111 << (3 * (ch - first) as u32);
        }
        i += 1;
    }
    bits
}

/// Die temperature in whole degrees Celsius, clamped at zero.
pub fn celsius(raw: u16) -> u16 {
    let mv = (raw as u32 * VREF_MV / FULL_SCALE) as i32;
    let c = (mv - V25_MV) * 1000 / SLOPE_UV_PER_C + 25;
    c.clamp(0, u16::MAX as i32) as u16
}
