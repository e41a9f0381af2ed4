// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Reference motor core.
//!
//! Targets written by the bus are staged and only reach the H-bridge in [`SensorimotorCore::step`],
//! which runs once per control cycle. A motor that stops hearing from the bus switches itself off:
//! the watchcat counts cycles since the last enable and disables the drive once the count passes
//! [`WATCHCAT_CYCLES`].

use log::{debug, warn};

use super::MotorCore;

/// Power limit after reset.
pub const DEFAULT_POWER_LIMIT: u8 = 32;
/// Control cycles without an enable before the drive is switched off.
pub const WATCHCAT_CYCLES: u16 = 100;

/// H-bridge driver stage.
pub trait HBridge {
    fn set_duty(&mut self, duty: u8);
    fn set_direction(&mut self, forward: bool);
    fn enable(&mut self);
    fn disable(&mut self);

    /// Driver reports a fault.
    fn fault(&self) -> bool {
        false
    }
}

/// One sample of the board's analog inputs, raw ADC counts except where noted.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Telemetry {
    pub position: u16,
    pub current: u16,
    pub voltage_supply: u16,
    /// Degrees Celsius.
    pub temperature: u16,
}

#[derive(Debug, Default, Clone, Copy)]
struct Target {
    power: u8,
    forward: bool,
}

pub struct SensorimotorCore<B> {
    bridge: B,
    enabled: bool,
    target: Target,
    limit: u8,
    inverted: bool,
    watchcat: u16,
    sensors: Telemetry,
    last_position: u16,
}

impl<B: HBridge> SensorimotorCore<B> {
    pub fn new(mut bridge: B) -> Self {
        bridge.set_duty(0);
        bridge.disable();
        Self {
            bridge,
            enabled: false,
            target: Target::default(),
            limit: DEFAULT_POWER_LIMIT,
            inverted: false,
            watchcat: 0,
            sensors: Telemetry::default(),
            last_position: 0,
        }
    }

    /// Run one control cycle with a fresh sensor sample.
    pub fn step(&mut self, sample: Telemetry) {
        self.sensors = sample;
        self.tick_watchcat();
        if self.enabled && self.bridge.fault() {
            warn!("driver fault, motor disabled");
            self.enabled = false;
        }
        self.apply_target();
    }

    /// Switch the drive off immediately, e.g. before handing over to the bootloader.
    pub fn halt(&mut self) {
        self.enabled = false;
        self.target.power = 0;
        self.apply_target();
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[inline]
    pub fn power_limit(&self) -> u8 {
        self.limit
    }

    pub fn free(self) -> B {
        self.bridge
    }

    fn tick_watchcat(&mut self) {
        if !self.enabled {
            return;
        }
        self.watchcat = self.watchcat.saturating_add(1);
        if self.watchcat > WATCHCAT_CYCLES {
            debug!("watchcat: no enable for {} cycles", self.watchcat);
            self.enabled = false;
        }
    }

    fn apply_target(&mut self) {
        if self.enabled {
            self.bridge.set_duty(self.target.power.min(self.limit));
            self.bridge.set_direction(self.target.forward != self.inverted);
            self.bridge.enable();
        } else {
            self.bridge.set_duty(0);
            self.bridge.disable();
            self.target.power = 0;
        }
    }
}

impl<B: HBridge> MotorCore for SensorimotorCore<B> {
    fn enable(&mut self) {
        self.enabled = true;
        self.watchcat = 0;
    }

    fn disable(&mut self) {
        self.enabled = false;
    }

    fn set_target_power(&mut self, power: u8) {
        self.target.power = power;
    }

    fn set_target_direction(&mut self, forward: bool) {
        self.target.forward = forward;
    }

    fn set_power_limit(&mut self, limit: u8) {
        self.limit = limit;
    }

    fn set_default_direction(&mut self, inverted: bool) {
        self.inverted = inverted;
    }

    fn position(&self) -> u16 {
        self.sensors.position
    }

    fn current(&self) -> u16 {
        self.sensors.current
    }

    fn velocity(&mut self) -> u16 {
        let delta = self.sensors.position.wrapping_sub(self.last_position);
        self.last_position = self.sensors.position;
        delta
    }

    fn voltage_supply(&self) -> u16 {
        self.sensors.voltage_supply
    }

    fn temperature(&self) -> u16 {
        self.sensors.temperature
    }
}
