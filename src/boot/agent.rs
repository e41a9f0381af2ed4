// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Firmware update agent.
//!
//! Executes one request per packet. The first data byte selects the command:
//!
//! | Command | Payload | Effect |
//! | ------- | ------- | ------ |
//! | `S` | - | acknowledge, used as a liveness probe |
//! | `I` | 3 signature bytes | succeed if they match this device |
//! | `W` | checksum (LE u16), page | program the page at the cursor, advance the cursor |
//! | `R` | - | acknowledge; the caller resets the device |
//!
//! A page write is verified completely before the first byte of program memory is touched.

use log::{info, warn};

use super::{Error, Reply, CMD_IDENTIFY, CMD_RESET, CMD_START, CMD_WRITE, PAGE_SIZE};
use crate::hw::ProgramMemory;

/// Ones'-complement sum of the little-endian 16-bit words of `page`, folded to 16 bits.
///
/// A trailing odd byte is ignored.
pub fn page_checksum(page: &[u8]) -> u16 {
    let mut sum: u32 = page
        .chunks_exact(2)
        .map(|w| u16::from_le_bytes([w[0], w[1]]) as u32)
        .sum();
    while sum >> 16 != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }
    sum as u16
}

pub struct UpdateAgent<M> {
    memory: M,
    signature: [u8; 3],
    cursor: u32,
}

impl<M: ProgramMemory> UpdateAgent<M> {
    pub fn new(memory: M, signature: [u8; 3]) -> Self {
        let cursor = memory.base_address();
        Self {
            memory,
            signature,
            cursor,
        }
    }

    /// Address the next page write goes to.
    #[inline]
    pub fn cursor(&self) -> u32 {
        self.cursor
    }

    pub fn memory(&self) -> &M {
        &self.memory
    }

    /// Execute one request.
    pub fn handle(&mut self, packet: &[u8]) -> Reply {
        let Some((&command, payload)) = packet.split_first() else {
            return Reply::rejected();
        };
        let result = match command {
            CMD_START => Ok(()),
            CMD_IDENTIFY => self.identify(payload),
            CMD_WRITE => self.write_page(payload),
            CMD_RESET => {
                info!("reset requested");
                Ok(())
            }
            other => Err(Error::UnknownCommand(other)),
        };
        match result {
            Ok(()) => Reply {
                accepted: true,
                reset: command == CMD_RESET,
            },
            Err(e) => {
                warn!("request {:?} rejected: {:?}", command as char, e);
                Reply::rejected()
            }
        }
    }

    pub fn identify(&self, payload: &[u8]) -> Result<(), Error<M::Error>> {
        if payload.len() != self.signature.len() {
            return Err(Error::LengthMismatch);
        }
        if payload != self.signature {
            return Err(Error::SignatureMismatch);
        }
        Ok(())
    }

    /// Program one page at the cursor from `[checksum lo, checksum hi, page..]`.
    pub fn write_page(&mut self, payload: &[u8]) -> Result<(), Error<M::Error>> {
        if payload.len() != PAGE_SIZE + 2 {
            return Err(Error::LengthMismatch);
        }
        let (sum, page) = payload.split_at(2);
        let expected = u16::from_le_bytes([sum[0], sum[1]]);
        let actual = page_checksum(page);
        if actual != expected {
            return Err(Error::ChecksumMismatch { expected, actual });
        }

        let address = self.cursor;
        self.memory
            .critical(|mem| -> Result<(), M::Error> {
                mem.wait_ready()?;
                mem.erase_page(address)?;
                mem.wait_ready()?;
                mem.fill_page(address, page)?;
                mem.commit_page(address)?;
                mem.wait_ready()?;
                mem.enable_execution();
                Ok(())
            })
            .map_err(Error::Memory)?;

        self.cursor += PAGE_SIZE as u32;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FlashOp, OutOfRange, RamFlash};
    use std::vec::Vec;

    const BASE: u32 = 0x0801_0000;
    const SIGNATURE: [u8; 3] = [0x1E, 0x95, 0x0F];

    fn agent() -> UpdateAgent<RamFlash> {
        UpdateAgent::new(RamFlash::new(BASE, 2 * PAGE_SIZE), SIGNATURE)
    }

    fn write_request(page: &[u8]) -> Vec<u8> {
        let mut req = std::vec![CMD_WRITE];
        req.extend_from_slice(&page_checksum(page).to_le_bytes());
        req.extend_from_slice(page);
        req
    }

    fn page(seed: u8) -> Vec<u8> {
        (0..PAGE_SIZE).map(|i| (i as u8).wrapping_mul(7) ^ seed).collect()
    }

    #[test]
    fn checksum_folds_carries() {
        assert_eq!(page_checksum(&[0x01, 0x00, 0x02, 0x00]), 3);
        assert_eq!(page_checksum(&[0xFF, 0xFF, 0x02, 0x00]), 2);
        assert_eq!(page_checksum(&[0xFF; PAGE_SIZE]), 0xFFFF);
    }

    #[test]
    fn start_is_acknowledged() {
        let reply = agent().handle(b"S");
        assert!(reply.accepted);
        assert!(!reply.reset);
    }

    #[test]
    fn identify_matches_signature() {
        let mut a = agent();
        assert!(a.handle(&[b'I', 0x1E, 0x95, 0x0F]).accepted);
        assert!(!a.handle(&[b'I', 0x1E, 0x95, 0x0E]).accepted);
        assert!(!a.handle(&[b'I', 0x1E, 0x95]).accepted);
    }

    #[test]
    fn valid_page_is_programmed_and_cursor_advances() {
        let mut a = agent();
        let first = page(1);
        let second = page(2);
        assert!(a.handle(&write_request(&first)).accepted);
        assert!(a.handle(&write_request(&second)).accepted);

        assert_eq!(a.cursor(), BASE + 2 * PAGE_SIZE as u32);
        assert_eq!(&a.memory().memory[..PAGE_SIZE], &first[..]);
        assert_eq!(&a.memory().memory[PAGE_SIZE..], &second[..]);
        assert_eq!(
            &a.memory().ops[..8],
            &[
                FlashOp::Critical,
                FlashOp::Wait,
                FlashOp::Erase(BASE),
                FlashOp::Wait,
                FlashOp::Fill(BASE),
                FlashOp::Commit(BASE),
                FlashOp::Wait,
                FlashOp::Execute,
            ]
        );
    }

    #[test]
    fn bad_checksum_leaves_memory_untouched() {
        let mut a = agent();
        let mut req = write_request(&page(3));
        req[1] ^= 0x01;
        assert_eq!(
            a.write_page(&req[1..]),
            Err(Error::ChecksumMismatch {
                expected: page_checksum(&page(3)) ^ 0x0001,
                actual: page_checksum(&page(3)),
            })
        );
        assert!(!a.handle(&req).accepted);
        assert!(a.memory().ops.is_empty());
        assert_eq!(a.cursor(), BASE);
    }

    #[test]
    fn wrong_length_leaves_memory_untouched() {
        let mut a = agent();
        let mut req = write_request(&page(4));
        req.pop();
        assert!(!a.handle(&req).accepted);
        assert!(a.memory().ops.is_empty());
    }

    #[test]
    fn write_past_the_end_fails() {
        let mut a = agent();
        a.handle(&write_request(&page(1)));
        a.handle(&write_request(&page(2)));
        assert_eq!(
            a.write_page(&write_request(&page(3))[1..]),
            Err(Error::Memory(OutOfRange(BASE + 2 * PAGE_SIZE as u32)))
        );
        assert_eq!(a.cursor(), BASE + 2 * PAGE_SIZE as u32);
    }

    #[test]
    fn failed_fill_stops_before_commit() {
        let mut a = UpdateAgent::new(
            RamFlash {
                fail_fill: true,
                ..RamFlash::new(BASE, 2 * PAGE_SIZE)
            },
            SIGNATURE,
        );
        assert!(!a.handle(&write_request(&page(5))).accepted);
        assert_eq!(
            a.memory().ops,
            std::vec![FlashOp::Critical, FlashOp::Wait, FlashOp::Erase(BASE), FlashOp::Wait]
        );
        assert_eq!(a.cursor(), BASE);
    }

    #[test]
    fn reset_is_acknowledged_and_flagged() {
        let reply = agent().handle(b"R");
        assert!(reply.accepted);
        assert!(reply.reset);
    }

    #[test]
    fn unknown_command_is_rejected() {
        let mut a = agent();
        assert!(!a.handle(b"X").accepted);
        assert!(!a.handle(&[]).accepted);
    }
}
