// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Outgoing response buffer.

use heapless::Vec;

use crate::assertion::{check, stop, Assertion};
use crate::hw::{Error, HalfDuplex, SerialPort};
use crate::protocol::messages::{checksum, MSG_RAW_RESPONSE, SYNC_BYTE};

/// Capacity of the runtime response buffer, syncs and checksum included.
pub const SEND_BUFFER_SIZE: usize = 16;

/// A response under construction, pre-seeded with the two sync bytes.
///
/// The last slot is reserved for the checksum appended by [`SendBuffer::flush`]. Adding more
/// bytes than fit is fatal; a truncated response would still carry a valid checksum.
pub struct SendBuffer<const N: usize> {
    bytes: Vec<u8, N>,
}

impl<const N: usize> Default for SendBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> SendBuffer<N> {
    pub fn new() -> Self {
        let mut buffer = Self { bytes: Vec::new() };
        buffer.reset();
        buffer
    }

    fn reset(&mut self) {
        self.bytes.clear();
        check(
            self.bytes.extend_from_slice(&[SYNC_BYTE, SYNC_BYTE]).is_ok(),
            Assertion::BufferExceeded,
        );
    }

    pub fn add_byte(&mut self, byte: u8) {
        if self.bytes.len() + 1 >= N {
            stop(Assertion::BufferExceeded);
        }
        // Capacity checked above.
        let _ = self.bytes.push(byte);
    }

    /// Append a big-endian word.
    pub fn add_word(&mut self, word: u16) {
        let [hi, lo] = word.to_be_bytes();
        self.add_byte(hi);
        self.add_byte(lo);
    }

    /// Append a length-prefixed raw reply, `56 <id> <len> <data..>`.
    pub fn add_packaged(&mut self, id: u8, data: &[u8]) {
        self.add_byte(MSG_RAW_RESPONSE);
        self.add_byte(id);
        self.add_byte(data.len() as u8);
        for &b in data {
            self.add_byte(b);
        }
    }

    /// Drop everything queued since the last flush.
    pub fn discard(&mut self) {
        self.reset();
    }

    /// True when nothing beyond the sync preamble is queued.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.len() <= 2
    }

    /// Queued bytes, syncs included, checksum not yet appended.
    #[inline]
    pub fn queued(&self) -> &[u8] {
        &self.bytes
    }

    /// Checksum the queued response and put it on the wire.
    ///
    /// Does nothing when the buffer is empty. The line is back in receive mode and the buffer
    /// empty when this returns, whether or not the port reported an error.
    pub fn flush<P, L>(&mut self, port: &mut P, line: &mut L) -> Result<(), Error<P::Error>>
    where
        P: SerialPort,
        L: HalfDuplex,
    {
        if self.is_empty() {
            return Ok(());
        }
        let cs = checksum(&self.bytes);
        // The checksum slot is never handed out by add_byte.
        let _ = self.bytes.push(cs);

        line.send_mode();
        let result = self
            .bytes
            .iter()
            .try_for_each(|&b| port.write(b))
            .and_then(|()| port.flush());
        line.receive_mode();

        self.reset();
        result.map_err(Error::Serial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{LineEvent, PortError, QueuePort, RecordingLine};
    use std::vec;

    #[test]
    fn empty_flush_leaves_the_line_alone() {
        let mut buf = SendBuffer::<SEND_BUFFER_SIZE>::new();
        let mut port = QueuePort::default();
        let mut line = RecordingLine::default();
        assert_eq!(buf.flush(&mut port, &mut line), Ok(()));
        assert!(port.tx.is_empty());
        assert!(line.events.is_empty());
    }

    #[test]
    fn ping_response_on_the_wire() {
        let mut buf = SendBuffer::<SEND_BUFFER_SIZE>::new();
        let mut port = QueuePort::default();
        let mut line = RecordingLine::default();
        buf.add_byte(0xE1);
        buf.add_byte(23);
        buf.flush(&mut port, &mut line).unwrap();

        assert_eq!(port.tx, vec![0xFF, 0xFF, 0xE1, 23, 0x0A]);
        assert_eq!(port.flushes, 1);
        assert_eq!(line.events, vec![LineEvent::Send, LineEvent::Receive]);
        assert!(buf.is_empty());
    }

    #[test]
    fn words_are_big_endian() {
        let mut buf = SendBuffer::<SEND_BUFFER_SIZE>::new();
        buf.add_word(0x1234);
        assert_eq!(buf.queued(), &[0xFF, 0xFF, 0x12, 0x34]);
    }

    #[test]
    fn packaged_reply_layout() {
        let mut buf = SendBuffer::<SEND_BUFFER_SIZE>::new();
        buf.add_packaged(5, b"Y");
        assert_eq!(buf.queued(), &[0xFF, 0xFF, 0x56, 5, 1, b'Y']);
    }

    #[test]
    fn discard_drops_queued_bytes() {
        let mut buf = SendBuffer::<SEND_BUFFER_SIZE>::new();
        buf.add_word(0xBEEF);
        buf.discard();
        assert!(buf.is_empty());
    }

    #[test]
    fn failed_write_still_releases_the_line() {
        let mut buf = SendBuffer::<SEND_BUFFER_SIZE>::new();
        let mut port = QueuePort {
            closed: true,
            ..Default::default()
        };
        let mut line = RecordingLine::default();
        buf.add_byte(0xE1);
        assert_eq!(
            buf.flush(&mut port, &mut line),
            Err(Error::Serial(PortError::Closed))
        );
        assert_eq!(line.events.last(), Some(&LineEvent::Receive));
        assert!(buf.is_empty());
    }

    #[test]
    fn fills_up_to_the_checksum_slot() {
        let mut buf = SendBuffer::<8>::new();
        for b in 0..5 {
            buf.add_byte(b);
        }
        assert_eq!(buf.queued().len(), 7);
    }

    #[test]
    #[should_panic(expected = "code 8")]
    fn overflow_is_fatal() {
        let mut buf = SendBuffer::<8>::new();
        for b in 0..6 {
            buf.add_byte(b);
        }
    }
}
