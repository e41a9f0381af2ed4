// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Bootloader packet framing.
//!
//! A request is `FF FF 55 <id> <len> <data..> <cs>`, checksummed like every other frame on the
//! bus. The bootloader only ever looks at whole packets addressed to itself, so the receiver
//! needs no knowledge of the runtime opcode table.

use heapless::Vec;

use crate::protocol::messages::{checksum, MSG_RAW_DATA, SYNC_BYTE};

/// Longest packet on the wire: header, 255 data bytes, checksum.
pub const MAX_PACKET: usize = 5 + 255 + 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rx {
    Sync,
    Sync2,
    Code,
    Id,
    Length,
    Data,
    Checksum,
}

/// Reassembles request packets from a byte stream.
pub struct PacketReceiver {
    id: u8,
    state: Rx,
    sum: u8,
    len: u8,
    data: Vec<u8, 255>,
}

impl PacketReceiver {
    pub fn new(id: u8) -> Self {
        Self {
            id,
            state: Rx::Sync,
            sum: 0,
            len: 0,
            data: Vec::new(),
        }
    }

    /// Drop any partial packet.
    pub fn restart(&mut self) {
        self.state = Rx::Sync;
        self.sum = 0;
        self.len = 0;
        self.data.clear();
    }

    /// Consume one byte; returns the data of a complete, valid packet addressed to this node.
    ///
    /// Packets with a bad checksum or no data are dropped silently.
    pub fn push(&mut self, byte: u8) -> Option<&[u8]> {
        if self.state == Rx::Sync {
            self.restart();
        }
        self.sum = self.sum.wrapping_add(byte);
        let state = self.state;
        self.state = match state {
            Rx::Sync if byte == SYNC_BYTE => Rx::Sync2,
            Rx::Sync2 if byte == SYNC_BYTE => Rx::Code,
            // Longer preambles keep the receiver in sync.
            Rx::Code if byte == SYNC_BYTE => {
                self.sum = SYNC_BYTE.wrapping_add(SYNC_BYTE);
                Rx::Code
            }
            Rx::Code if byte == MSG_RAW_DATA => Rx::Id,
            Rx::Id if byte == self.id => Rx::Length,
            Rx::Length => {
                self.len = byte;
                if byte == 0 {
                    Rx::Checksum
                } else {
                    Rx::Data
                }
            }
            Rx::Data => {
                // At most `len` <= 255 bytes are pushed.
                let _ = self.data.push(byte);
                if self.data.len() < self.len as usize {
                    Rx::Data
                } else {
                    Rx::Checksum
                }
            }
            Rx::Checksum => {
                let valid = self.sum == 0 && !self.data.is_empty();
                self.state = Rx::Sync;
                return valid.then_some(self.data.as_slice());
            }
            _ => Rx::Sync,
        };
        None
    }
}

/// Build a request packet for node `id`. Returns `None` when `data` is longer than 255 bytes.
pub fn encode(id: u8, data: &[u8]) -> Option<Vec<u8, MAX_PACKET>> {
    let len = u8::try_from(data.len()).ok()?;
    let mut packet = Vec::new();
    packet
        .extend_from_slice(&[SYNC_BYTE, SYNC_BYTE, MSG_RAW_DATA, id, len])
        .ok()?;
    packet.extend_from_slice(data).ok()?;
    let cs = checksum(&packet);
    packet.push(cs).ok()?;
    Some(packet)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn receive(rx: &mut PacketReceiver, bytes: &[u8]) -> std::vec::Vec<std::vec::Vec<u8>> {
        let mut packets = std::vec::Vec::new();
        for &b in bytes {
            if let Some(p) = rx.push(b) {
                packets.push(p.to_vec());
            }
        }
        packets
    }

    #[test]
    fn encoded_packet_layout() {
        let packet = encode(127, b"S").unwrap();
        assert_eq!(&packet[..], &[0xFF, 0xFF, 0x55, 127, 1, b'S', 0xDA]);
    }

    #[test]
    fn receives_own_packet() {
        let mut rx = PacketReceiver::new(9);
        let packet = encode(9, b"I\x1e\x95\x0f").unwrap();
        assert_eq!(receive(&mut rx, &packet), std::vec![b"I\x1e\x95\x0f".to_vec()]);
    }

    #[test]
    fn ignores_other_ids_and_bad_checksums() {
        let mut rx = PacketReceiver::new(9);
        let mut bytes = encode(10, b"S").unwrap().to_vec();
        let mut bad = encode(9, b"S").unwrap();
        let last = bad.len() - 1;
        bad[last] ^= 1;
        bytes.extend_from_slice(&bad);
        bytes.extend_from_slice(&encode(9, b"R").unwrap());
        assert_eq!(receive(&mut rx, &bytes), std::vec![b"R".to_vec()]);
    }

    #[test]
    fn empty_packets_are_ignored() {
        let mut rx = PacketReceiver::new(9);
        assert!(receive(&mut rx, &encode(9, &[]).unwrap()).is_empty());
    }

    #[test]
    fn resyncs_after_noise_and_long_preamble() {
        let mut rx = PacketReceiver::new(9);
        let mut bytes = std::vec![0x12, 0xFF, 0x00, 0xFF];
        bytes.extend_from_slice(&encode(9, b"S").unwrap());
        assert_eq!(receive(&mut rx, &bytes), std::vec![b"S".to_vec()]);
    }

    #[test]
    fn oversized_data_cannot_be_encoded() {
        assert!(encode(1, &[0; 256]).is_none());
        assert_eq!(encode(1, &[0; 255]).map(|p| p.len()), Some(MAX_PACKET));
    }
}
