// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Sector 0 bootloader.
//!
//! Starts the application right away unless an update was requested, the reset button was
//! pressed, or there is no application. Otherwise it answers update packets on the bus until a
//! reset request arrives. The yellow LED stays lit while the bootloader is resident.

#![no_main]
#![no_std]

use cortex_m_rt::entry;
use log::{info, LevelFilter};
use panic_halt as _;

use hal::{
    pac,
    prelude::*,
    serial::{Config, Serial},
};
use stm32f7xx_hal as hal;

use sensorimotor::{
    boot::{stay_in_bootloader, Bootloader, UpdateAgent},
    hw::stm32::{
        logger, system, BoardPins, BusPort, CycleDelay, Flash, PushPullPin, Usart,
        DEVICE_SIGNATURE,
    },
    hw::{Led, Rs485},
    identity,
    protocol::DEFAULT_ID,
};

const SYSCLK_HZ: u32 = 216_000_000;
const BUS_BAUD: u32 = 1_000_000;
const DEBUG_BAUD: u32 = 115_200;

#[entry]
fn main() -> ! {
    // Decide before touching any peripheral, so the application starts from a clean reset state.
    let cause = system::reset_cause();
    let magic = system::take_update_magic();
    if !stay_in_bootloader(magic, cause, system::application_present()) {
        system::start_application();
    }

    // Peripherals
    let dp = pac::Peripherals::take().unwrap();

    // Clocks
    let rcc = dp.RCC.constrain();
    let clocks = rcc.cfgr.sysclk(SYSCLK_HZ.Hz()).freeze();

    let pins = BoardPins::new(dp.GPIOA, dp.GPIOC, dp.GPIOD);

    // LED
    let mut resident = Led::active_low(PushPullPin::new(pins.leds.yellow));
    resident.on();

    // USART1 (DBG)
    let debug_cfg = Config {
        baud_rate: DEBUG_BAUD.bps(),
        ..Default::default()
    };
    let debug = Serial::new(dp.USART1, (pins.debug.tx, pins.debug.rx), &clocks, debug_cfg);
    logger::init(Usart::new(debug), LevelFilter::Info);

    // USART2 (RS-485 bus)
    let bus_cfg = Config {
        baud_rate: BUS_BAUD.bps(),
        ..Default::default()
    };
    let bus = Serial::new(dp.USART2, (pins.bus.tx, pins.bus.rx), &clocks, bus_cfg);
    let line = Rs485::new(
        PushPullPin::new(pins.bus.drive_enable),
        PushPullPin::new(pins.bus.read_disable),
        CycleDelay::new(clocks.sysclk().raw()),
    );

    let mut flash = Flash::new(dp.FLASH);
    let id = identity::read_id(&mut flash).unwrap_or(DEFAULT_ID);
    let agent = UpdateAgent::new(flash, DEVICE_SIGNATURE);
    let mut boot = Bootloader::new(BusPort::new(bus), line, id, agent);

    info!("bootloader {} resident after {:?}", id, cause);

    loop {
        if let Some(reply) = boot.poll() {
            if reply.reset {
                info!("update finished, resetting");
                logger::flush();
                system::arm_watchdog_reset();
            }
        }
    }
}
