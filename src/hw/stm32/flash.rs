// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Embedded flash programming through the FLASH register block.
//!
//! Single-bank layout of the STM32F777: four 32K sectors, one 128K sector, seven 256K sectors.
//! The bootloader owns sector 0, the identity bytes sector 1, and the application starts at
//! sector 2.

use core::ptr;

use stm32f7xx_hal::pac;

use crate::hw::{NvStore, ProgramMemory};

pub const BOOTLOADER_BASE: u32 = 0x0800_0000;
pub const IDENTITY_BASE: u32 = 0x0800_8000;
pub const APP_BASE: u32 = 0x0801_0000;
pub const FLASH_END: u32 = 0x0820_0000;

/// Start address of each sector, in order.
const SECTORS: [u32; 12] = [
    0x0800_0000,
    0x0800_8000,
    0x0801_0000,
    0x0801_8000,
    0x0802_0000,
    0x0804_0000,
    0x0808_0000,
    0x080C_0000,
    0x0810_0000,
    0x0814_0000,
    0x0818_0000,
    0x081C_0000,
];
const IDENTITY_SECTOR: u8 = 1;

/// Identity bytes mirrored across a sector erase.
const IDENTITY_SIZE: usize = 16;

const KEY1: u32 = 0x4567_0123;
const KEY2: u32 = 0xCDEF_89AB;

const CR_PG: u32 = 1 << 0;
const CR_SER: u32 = 1 << 1;
const CR_SNB_SHIFT: u32 = 3;
const CR_PSIZE_X8: u32 = 0b00 << 8;
const CR_PSIZE_X32: u32 = 0b10 << 8;
const CR_STRT: u32 = 1 << 16;
const CR_LOCK: u32 = 1 << 31;

const SR_BSY: u32 = 1 << 16;
/// OPERR, WRPERR, PGAERR, PGPERR, ERSERR
const SR_ERRORS: u32 = 0xF2;

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashError {
    /// Address outside the application area.
    OutOfRange(u32),
    /// Error flags raised by the controller (raw SR bits).
    Program(u32),
}

/// Owner of the flash controller.
pub struct Flash {
    regs: pac::FLASH,
}

impl Flash {
    pub fn new(regs: pac::FLASH) -> Self {
        Self { regs }
    }

    #[inline]
    pub fn free(self) -> pac::FLASH {
        self.regs
    }

    fn unlock(&mut self) {
        if self.regs.cr.read().bits() & CR_LOCK != 0 {
            self.regs.keyr.write(|w| unsafe { w.bits(KEY1) });
            self.regs.keyr.write(|w| unsafe { w.bits(KEY2) });
        }
    }

    fn lock(&mut self) {
        self.regs.cr.modify(|r, w| unsafe { w.bits(r.bits() | CR_LOCK) });
    }

    fn busy_wait(&mut self) -> Result<(), FlashError> {
        while self.regs.sr.read().bits() & SR_BSY != 0 {}

        let errors = self.regs.sr.read().bits() & SR_ERRORS;
        if errors != 0 {
            // Flags are write-one-to-clear.
            self.regs.sr.write(|w| unsafe { w.bits(errors) });
            return Err(FlashError::Program(errors));
        }
        Ok(())
    }

    fn erase_sector(&mut self, sector: u8) -> Result<(), FlashError> {
        self.busy_wait()?;
        self.unlock();
        let cr = CR_SER | ((sector as u32) << CR_SNB_SHIFT) | CR_PSIZE_X32;
        self.regs.cr.write(|w| unsafe { w.bits(cr) });
        self.regs.cr.write(|w| unsafe { w.bits(cr | CR_STRT) });
        let result = self.busy_wait();
        self.regs.cr.write(|w| unsafe { w.bits(0) });
        if result.is_err() {
            self.lock();
        }
        result
    }

    fn program_words(&mut self, address: u32, data: &[u8]) -> Result<(), FlashError> {
        self.busy_wait()?;
        self.unlock();
        self.regs
            .cr
            .write(|w| unsafe { w.bits(CR_PG | CR_PSIZE_X32) });
        let mut result = Ok(());
        for (i, word) in data.chunks(4).enumerate() {
            let mut bytes = [0xFF; 4];
            bytes[..word.len()].copy_from_slice(word);
            let target = (address + 4 * i as u32) as *mut u32;
            unsafe { ptr::write_volatile(target, u32::from_le_bytes(bytes)) };
            result = self.busy_wait();
            if result.is_err() {
                break;
            }
        }
        self.regs.cr.write(|w| unsafe { w.bits(0) });
        if result.is_err() {
            self.lock();
        }
        result
    }

    fn program_byte(&mut self, address: u32, value: u8) -> Result<(), FlashError> {
        self.busy_wait()?;
        self.unlock();
        self.regs.cr.write(|w| unsafe { w.bits(CR_PG | CR_PSIZE_X8) });
        unsafe { ptr::write_volatile(address as *mut u8, value) };
        let result = self.busy_wait();
        self.regs.cr.write(|w| unsafe { w.bits(0) });
        result
    }

    fn check_range(address: u32) -> Result<(), FlashError> {
        if (APP_BASE..FLASH_END).contains(&address) {
            Ok(())
        } else {
            Err(FlashError::OutOfRange(address))
        }
    }
}

fn read_byte(address: u32) -> u8 {
    unsafe { ptr::read_volatile(address as *const u8) }
}

impl NvStore for Flash {
    type Error = FlashError;

    fn read(&mut self, address: u16) -> u8 {
        if address as usize >= IDENTITY_SIZE {
            return 0xFF;
        }
        read_byte(IDENTITY_BASE + address as u32)
    }

    fn update(&mut self, address: u16, value: u8) -> Result<(), FlashError> {
        let offset = address as usize;
        if offset >= IDENTITY_SIZE {
            return Err(FlashError::OutOfRange(IDENTITY_BASE + address as u32));
        }
        let old = self.read(address);
        if old == value {
            return Ok(());
        }

        let result = if value & old == value {
            // Only clears bits, no erase needed.
            self.program_byte(IDENTITY_BASE + address as u32, value)
        } else {
            let mut shadow = [0xFF; IDENTITY_SIZE];
            for (i, b) in shadow.iter_mut().enumerate() {
                *b = read_byte(IDENTITY_BASE + i as u32);
            }
            shadow[offset] = value;
            self.erase_sector(IDENTITY_SECTOR)
                .and_then(|_| self.program_words(IDENTITY_BASE, &shadow))
        };
        self.lock();
        result
    }
}

impl ProgramMemory for Flash {
    type Error = FlashError;

    fn base_address(&self) -> u32 {
        APP_BASE
    }

    /// Erases the whole sector when `address` starts one; later pages of that sector are
    /// already blank.
    fn erase_page(&mut self, address: u32) -> Result<(), FlashError> {
        Self::check_range(address)?;
        match SECTORS.iter().position(|&start| start == address) {
            Some(sector) => self.erase_sector(sector as u8),
            None => Ok(()),
        }
    }

    fn fill_page(&mut self, address: u32, page: &[u8]) -> Result<(), FlashError> {
        let last = address + (page.len() as u32).saturating_sub(1);
        let result = Self::check_range(address)
            .and_then(|_| Self::check_range(last))
            .and_then(|_| self.program_words(address, page));
        // The erase before may have left the controller unlocked.
        if result.is_err() {
            self.lock();
        }
        result
    }

    fn commit_page(&mut self, _address: u32) -> Result<(), FlashError> {
        self.lock();
        Ok(())
    }

    fn wait_ready(&mut self) -> Result<(), FlashError> {
        self.busy_wait()
    }

    fn enable_execution(&mut self) {
        cortex_m::asm::dsb();
        cortex_m::asm::isb();
    }

    fn critical<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        cortex_m::interrupt::free(|_| f(self))
    }
}
