// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Command handlers.
//!
//! Each verified frame is executed against the motor core, the external sensor and the identity
//! store, and its response is queued in the send buffer. Nothing is sent from here; the response
//! leaves when the controller flushes after the frame.

use log::info;

use crate::assertion::{stop, Assertion};
use crate::boot::{ACK, CMD_START};
use crate::hw::NvStore;
use crate::identity::Identity;
use crate::motor::{ExternalSensor, MotorCore};
use crate::protocol::messages::*;
use crate::protocol::parser::Frame;
use crate::protocol::sendbuffer::SendBuffer;

/// What the caller must do after a dispatch.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Done,
    /// The bootloader handshake was acknowledged; hand control to the update agent.
    Halt,
}

/// Execute a verified frame addressed to this node.
pub fn process<S, C, E, const N: usize>(
    frame: &Frame,
    identity: &mut Identity<S>,
    core: &mut C,
    sensor: &mut E,
    send: &mut SendBuffer<N>,
) -> Outcome
where
    S: NvStore,
    C: MotorCore,
    E: ExternalSensor,
{
    let Some(opcode) = frame.opcode() else {
        stop(Assertion::ProcessCommand)
    };

    match opcode {
        Opcode::DataRequest => {
            core.disable();
            core.set_target_power(0);
            telemetry(identity.id(), core, send);
        }
        Opcode::SetVoltage => {
            core.set_target_power(frame.arg());
            core.set_target_direction(frame.direction());
            core.enable();
            telemetry(identity.id(), core, send);
        }
        Opcode::Ping => {
            send.add_byte(MSG_PING_RESPONSE);
            send.add_byte(identity.id());
        }
        Opcode::SetPwmLimit => core.set_power_limit(frame.arg()),
        Opcode::SetId => {
            let id = identity.set_id(frame.arg());
            info!("node id set to {}", id);
            send.add_byte(MSG_SET_ID_RESPONSE);
            send.add_byte(id);
        }
        Opcode::Configure => {
            identity.set_default_direction(frame.arg() & 1 != 0);
            core.set_default_direction(identity.default_direction());
            info!("default direction inverted: {}", identity.default_direction());
            send.add_byte(MSG_CONFIGURE_RESPONSE);
            send.add_byte(identity.id());
        }
        Opcode::ExtSensorRequest => {
            let v = sensor.values();
            send.add_byte(MSG_EXT_SENSOR_RESPONSE);
            send.add_byte(identity.id());
            send.add_word(v.x as u16);
            send.add_word(v.y as u16);
            send.add_word(v.z as u16);
            sensor.restart();
        }
        Opcode::RawData => {
            if frame.payload() == [CMD_START] {
                info!("bootloader handshake");
                send.add_packaged(identity.id(), &[ACK]);
                return Outcome::Halt;
            }
        }
        Opcode::DataResponse
        | Opcode::PingResponse
        | Opcode::SetIdResponse
        | Opcode::ConfigureResponse
        | Opcode::ExtSensorResponse
        | Opcode::RawResponse => stop(Assertion::ProcessCommand),
    }
    Outcome::Done
}

fn telemetry<C: MotorCore, const N: usize>(id: u8, core: &mut C, send: &mut SendBuffer<N>) {
    send.add_byte(MSG_DATA_RESPONSE);
    send.add_byte(id);
    send.add_word(core.position());
    send.add_word(core.current());
    send.add_word(core.velocity());
    send.add_word(core.voltage_supply());
    send.add_word(core.temperature());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motor::Vector3;
    use crate::protocol::parser::{Parser, State};
    use crate::protocol::sendbuffer::SEND_BUFFER_SIZE;
    use crate::testing::{frame, RamStore, TestCore, TestSensor};

    const ME: u8 = 23;

    struct Bench {
        identity: Identity<RamStore>,
        core: TestCore,
        sensor: TestSensor,
        send: SendBuffer<SEND_BUFFER_SIZE>,
    }

    impl Bench {
        fn new() -> Self {
            Self {
                identity: Identity::load(RamStore::with_id(ME), DEFAULT_ID),
                core: TestCore::default(),
                sensor: TestSensor::default(),
                send: SendBuffer::new(),
            }
        }

        fn run(&mut self, body: &[u8]) -> Outcome {
            let mut parser = Parser::new();
            for b in frame(body) {
                parser.feed(b, self.identity.id());
            }
            assert_eq!(parser.state(), State::Pending);
            process(
                parser.frame(),
                &mut self.identity,
                &mut self.core,
                &mut self.sensor,
                &mut self.send,
            )
        }
    }

    #[test]
    fn data_request_stops_the_motor_and_reports() {
        let mut b = Bench::new();
        b.core.enabled = true;
        b.core.power = 50;
        assert_eq!(b.run(&[MSG_DATA_REQUEST, ME]), Outcome::Done);
        assert!(!b.core.enabled);
        assert_eq!(b.core.power, 0);
        assert_eq!(
            b.send.queued(),
            &[0xFF, 0xFF, 0x80, ME, 0x01, 0x23, 0x04, 0x56, 0x07, 0x89, 0x0A, 0xBC, 0x0D, 0xEF]
        );
    }

    #[test]
    fn set_voltage_drives_and_reports() {
        let mut b = Bench::new();
        b.run(&[MSG_SET_VOLTAGE_REVERSE, ME, 77]);
        assert!(b.core.enabled);
        assert_eq!(b.core.power, 77);
        assert!(b.core.direction);
        assert_eq!(b.send.queued()[2], MSG_DATA_RESPONSE);

        let mut b = Bench::new();
        b.run(&[MSG_SET_VOLTAGE, ME, 1]);
        assert!(!b.core.direction);
    }

    #[test]
    fn ping_acknowledges_with_own_id() {
        let mut b = Bench::new();
        b.run(&[MSG_PING, ME]);
        assert_eq!(b.send.queued(), &[0xFF, 0xFF, MSG_PING_RESPONSE, ME]);
    }

    #[test]
    fn pwm_limit_has_no_response() {
        let mut b = Bench::new();
        b.run(&[MSG_SET_PWM_LIMIT, ME, 99]);
        assert_eq!(b.core.limit, 99);
        assert!(b.send.is_empty());
    }

    #[test]
    fn set_id_answers_under_the_new_id() {
        let mut b = Bench::new();
        b.run(&[MSG_SET_ID, ME, 42]);
        assert_eq!(b.identity.id(), 42);
        assert_eq!(b.send.queued(), &[0xFF, 0xFF, MSG_SET_ID_RESPONSE, 42]);
    }

    #[test]
    fn configure_persists_and_applies_direction() {
        let mut b = Bench::new();
        b.run(&[MSG_CONFIGURE, ME, 1]);
        assert!(b.identity.default_direction());
        assert!(b.core.default_direction);
        assert_eq!(b.send.queued(), &[0xFF, 0xFF, MSG_CONFIGURE_RESPONSE, ME]);
    }

    #[test]
    fn sensor_request_reports_then_restarts() {
        let mut b = Bench::new();
        b.sensor.values = Vector3 { x: 1, y: -1, z: 0x0203 };
        b.run(&[MSG_EXT_SENSOR_REQUEST, ME, 0]);
        assert_eq!(b.sensor.restarts, 1);
        assert_eq!(
            b.send.queued(),
            &[0xFF, 0xFF, MSG_EXT_SENSOR_RESPONSE, ME, 0x00, 0x01, 0xFF, 0xFF, 0x02, 0x03]
        );
    }

    #[test]
    fn start_handshake_halts() {
        let mut b = Bench::new();
        assert_eq!(b.run(&[MSG_RAW_DATA, ME, 1, b'S']), Outcome::Halt);
        assert_eq!(b.send.queued(), &[0xFF, 0xFF, MSG_RAW_RESPONSE, ME, 1, b'Y']);
    }

    #[test]
    fn other_raw_data_is_ignored() {
        let mut b = Bench::new();
        assert_eq!(b.run(&[MSG_RAW_DATA, ME, 2, b'S', b'S']), Outcome::Done);
        assert!(b.send.is_empty());
    }

    #[test]
    #[should_panic(expected = "code 2")]
    fn frame_without_opcode_is_fatal() {
        let mut b = Bench::new();
        let parser = Parser::new();
        process(
            parser.frame(),
            &mut b.identity,
            &mut b.core,
            &mut b.sensor,
            &mut b.send,
        );
    }
}
