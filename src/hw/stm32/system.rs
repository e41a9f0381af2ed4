// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Reset cause, the update handshake word, and control transfer between bootloader and
//! application.

use core::ptr;

use cortex_m::peripheral::{NVIC, SCB, SYST};
use stm32f7xx_hal::pac;

use super::flash::{APP_BASE, BOOTLOADER_BASE};
use crate::boot::{is_valid_stack_pointer, ResetCause, UPDATE_MAGIC};

/// Word just above the stack, outside the RAM region given to the linker.
const MAGIC_ADDRESS: u32 = 0x2007_FFF0;

// RCC_CSR flags
const CSR_RMVF: u32 = 1 << 24;
const CSR_BORRSTF: u32 = 1 << 25;
const CSR_PINRSTF: u32 = 1 << 26;
const CSR_PORRSTF: u32 = 1 << 27;
const CSR_SFTRSTF: u32 = 1 << 28;
const CSR_IWDGRSTF: u32 = 1 << 29;
const CSR_WWDGRSTF: u32 = 1 << 30;

/// Read and clear the reset flags.
///
/// PINRSTF accompanies every reset, so it only counts when nothing more specific is set.
pub fn reset_cause() -> ResetCause {
    let rcc = unsafe { &*pac::RCC::ptr() };
    let csr = rcc.csr.read().bits();
    rcc.csr.modify(|r, w| unsafe { w.bits(r.bits() | CSR_RMVF) });

    if csr & (CSR_PORRSTF | CSR_BORRSTF) != 0 {
        ResetCause::PowerOn
    } else if csr & (CSR_IWDGRSTF | CSR_WWDGRSTF) != 0 {
        ResetCause::Watchdog
    } else if csr & CSR_SFTRSTF != 0 {
        ResetCause::Software
    } else if csr & CSR_PINRSTF != 0 {
        ResetCause::Pin
    } else {
        ResetCause::Other
    }
}

/// Return the handshake word and clear it.
pub fn take_update_magic() -> u32 {
    unsafe {
        let magic = ptr::read_volatile(MAGIC_ADDRESS as *const u32);
        ptr::write_volatile(MAGIC_ADDRESS as *mut u32, 0);
        magic
    }
}

/// Ask the bootloader to stay resident on its next start.
pub fn request_update() {
    unsafe { ptr::write_volatile(MAGIC_ADDRESS as *mut u32, UPDATE_MAGIC) };
}

/// Whether the application area starts with a plausible vector table.
pub fn application_present() -> bool {
    let sp = unsafe { ptr::read_volatile(APP_BASE as *const u32) };
    is_valid_stack_pointer(sp)
}

/// Reset through the independent watchdog with the shortest timeout.
pub fn arm_watchdog_reset() -> ! {
    let iwdg = unsafe { &*pac::IWDG::ptr() };
    iwdg.kr.write(|w| unsafe { w.bits(0xCCCC) });
    iwdg.kr.write(|w| unsafe { w.bits(0x5555) });
    iwdg.pr.write(|w| unsafe { w.bits(0) });
    iwdg.rlr.write(|w| unsafe { w.bits(1) });
    loop {
        cortex_m::asm::nop();
    }
}

/// Jump into the image whose vector table sits at `vector_table`.
///
/// # Safety
///
/// `vector_table` must hold a valid initial stack pointer and reset vector. Everything the
/// caller owns is abandoned.
pub unsafe fn transfer_control(vector_table: u32) -> ! {
    cortex_m::interrupt::disable();

    let syst = &*SYST::PTR;
    syst.csr.write(0);

    let nvic = &*NVIC::PTR;
    for i in 0..8 {
        nvic.icer[i].write(0xFFFF_FFFF);
        nvic.icpr[i].write(0xFFFF_FFFF);
    }

    let scb = &*SCB::PTR;
    scb.vtor.write(vector_table);

    // Nothing is left that could fire before the new image sets itself up.
    cortex_m::interrupt::enable();
    cortex_m::asm::bootload(vector_table as *const u32)
}

/// Start the application if one is present. Returns otherwise.
pub fn start_application() {
    if application_present() {
        unsafe { transfer_control(APP_BASE) }
    }
}

/// Hand over to the bootloader for an update.
pub fn start_bootloader() -> ! {
    request_update();
    unsafe { transfer_control(BOOTLOADER_BASE) }
}
