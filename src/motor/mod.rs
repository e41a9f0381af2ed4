// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Motor and sensor collaborators of the bus protocol.
//!
//! The dispatcher only ever talks to a [`MotorCore`] and an [`ExternalSensor`]. Commands set
//! staged targets; the control cycle applies them, so one dispatch is always observed as a
//! whole.

pub mod sensorimotor;

pub use sensorimotor::{HBridge, SensorimotorCore, Telemetry};

/// Motor control core as seen by the bus.
pub trait MotorCore {
    fn enable(&mut self);
    fn disable(&mut self);

    fn set_target_power(&mut self, power: u8);

    /// `true` selects the forward direction before default-direction inversion.
    fn set_target_direction(&mut self, forward: bool);

    fn set_power_limit(&mut self, limit: u8);

    /// Invert every commanded direction when `inverted` is set.
    fn set_default_direction(&mut self, inverted: bool);

    fn position(&self) -> u16;
    fn current(&self) -> u16;

    /// Change in position since the previous call.
    fn velocity(&mut self) -> u16;

    fn voltage_supply(&self) -> u16;
    fn temperature(&self) -> u16;
}

/// Three-axis reading.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Vector3 {
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

/// Sensor attached to the board's expansion port.
pub trait ExternalSensor {
    /// Start a new measurement.
    fn restart(&mut self);

    /// The most recent measurement.
    fn values(&self) -> Vector3;
}

/// Stand-in for boards without an expansion sensor. Always reads zero.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSensor;

impl ExternalSensor for NoSensor {
    fn restart(&mut self) {}

    fn values(&self) -> Vector3 {
        Vector3::default()
    }
}
