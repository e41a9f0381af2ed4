// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Wire constants and the opcode table of the sensorimotor bus.
//!
//! Every frame is `FF FF <opcode> <address> [payload] <checksum>`, where the checksum makes the
//! byte sum of the whole frame, syncs included, zero modulo 256. Command opcodes have a matching
//! response opcode that every other node on the bus must skip.

/// Sync byte, sent twice at the start of every frame.
pub const SYNC_BYTE: u8 = 0xFF;
/// Highest valid node id.
pub const MAX_ID: u8 = 127;
/// Node id used when none was ever stored.
pub const DEFAULT_ID: u8 = 127;

// Commands
pub const MSG_DATA_REQUEST: u8 = 0xC0;
pub const MSG_SET_VOLTAGE: u8 = 0xB0;
pub const MSG_SET_VOLTAGE_REVERSE: u8 = 0xB1;
pub const MSG_PING: u8 = 0xE0;
pub const MSG_SET_PWM_LIMIT: u8 = 0xA0;
pub const MSG_SET_ID: u8 = 0x70;
pub const MSG_CONFIGURE: u8 = 0x50;
pub const MSG_EXT_SENSOR_REQUEST: u8 = 0x40;
pub const MSG_RAW_DATA: u8 = 0x55;

// Responses
pub const MSG_DATA_RESPONSE: u8 = 0x80;
pub const MSG_PING_RESPONSE: u8 = 0xE1;
pub const MSG_SET_ID_RESPONSE: u8 = 0x71;
pub const MSG_CONFIGURE_RESPONSE: u8 = 0x51;
pub const MSG_EXT_SENSOR_RESPONSE: u8 = 0x41;
pub const MSG_RAW_RESPONSE: u8 = 0x56;

/// Whether a node acts on an opcode or only skips it.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Command,
    Response,
}

/// Payload length rule of an opcode, not counting address and checksum.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payload {
    Fixed(u8),
    /// The first payload byte gives the number of bytes that follow it.
    LengthPrefixed,
}

/// The closed set of opcodes understood on the bus.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    DataRequest,
    SetVoltage,
    Ping,
    SetPwmLimit,
    SetId,
    Configure,
    ExtSensorRequest,
    RawData,
    DataResponse,
    PingResponse,
    SetIdResponse,
    ConfigureResponse,
    ExtSensorResponse,
    RawResponse,
}

impl Opcode {
    pub fn from_byte(byte: u8) -> Option<Self> {
        Some(match byte {
            MSG_DATA_REQUEST => Self::DataRequest,
            MSG_SET_VOLTAGE | MSG_SET_VOLTAGE_REVERSE => Self::SetVoltage,
            MSG_PING => Self::Ping,
            MSG_SET_PWM_LIMIT => Self::SetPwmLimit,
            MSG_SET_ID => Self::SetId,
            MSG_CONFIGURE => Self::Configure,
            MSG_EXT_SENSOR_REQUEST => Self::ExtSensorRequest,
            MSG_RAW_DATA => Self::RawData,
            MSG_DATA_RESPONSE => Self::DataResponse,
            MSG_PING_RESPONSE => Self::PingResponse,
            MSG_SET_ID_RESPONSE => Self::SetIdResponse,
            MSG_CONFIGURE_RESPONSE => Self::ConfigureResponse,
            MSG_EXT_SENSOR_RESPONSE => Self::ExtSensorResponse,
            MSG_RAW_RESPONSE => Self::RawResponse,
            _ => return None,
        })
    }

    pub fn kind(self) -> Kind {
        match self {
            Self::DataRequest
            | Self::SetVoltage
            | Self::Ping
            | Self::SetPwmLimit
            | Self::SetId
            | Self::Configure
            | Self::ExtSensorRequest
            | Self::RawData => Kind::Command,
            _ => Kind::Response,
        }
    }

    pub fn payload(self) -> Payload {
        match self {
            Self::DataRequest | Self::Ping => Payload::Fixed(0),
            Self::SetVoltage
            | Self::SetPwmLimit
            | Self::SetId
            | Self::Configure
            | Self::ExtSensorRequest => Payload::Fixed(1),
            Self::RawData | Self::RawResponse => Payload::LengthPrefixed,
            // Five telemetry words.
            Self::DataResponse => Payload::Fixed(10),
            Self::PingResponse | Self::SetIdResponse | Self::ConfigureResponse => Payload::Fixed(0),
            // x, y and z words.
            Self::ExtSensorResponse => Payload::Fixed(6),
        }
    }
}

/// Byte that makes `bytes` plus itself sum to zero modulo 256.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes
        .iter()
        .fold(0u8, |acc, &b| acc.wrapping_add(b))
        .wrapping_neg()
}
