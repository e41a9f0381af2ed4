// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Runtime firmware of the sensorimotor node.
//!
//! Runs the motor core once per millisecond off SysTick and services the bus in between. The
//! red LED is lit while a control cycle runs. A bootloader handshake stops the motor and hands
//! over to the update agent in sector 0.

#![no_main]
#![no_std]

use core::panic::PanicInfo;

use cortex_m::peripheral::syst::SystClkSource;
use cortex_m_rt::entry;
use log::{error, info, LevelFilter};

use hal::{
    pac,
    prelude::*,
    serial::{Config, Serial},
};
use stm32f7xx_hal as hal;

use sensorimotor::{
    assertion,
    hw::stm32::{
        logger, system, BoardPins, BusPort, CycleDelay, Drv8873Bridge, Flash, PushPullPin,
        TelemetryAdc, Usart,
    },
    hw::{Led, Rs485, StatusLeds},
    motor::{NoSensor, SensorimotorCore},
    protocol::{self, Communication},
};

const SYSCLK_HZ: u32 = 216_000_000;
const CYCLE_HZ: u32 = 1_000;
const BUS_BAUD: u32 = 1_000_000;
const DEBUG_BAUD: u32 = 115_200;

#[entry]
fn main() -> ! {
    // Peripherals
    let dp = pac::Peripherals::take().unwrap();
    let cp = cortex_m::Peripherals::take().unwrap();

    // Clocks
    let rcc = dp.RCC.constrain();
    let clocks = rcc.cfgr.sysclk(SYSCLK_HZ.Hz()).freeze();

    let pins = BoardPins::new(dp.GPIOA, dp.GPIOC, dp.GPIOD);

    // LED
    let mut leds = StatusLeds::new(
        Led::active_low(PushPullPin::new(pins.leds.red)),
        Led::active_low(PushPullPin::new(pins.leds.yellow)),
    );

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

    // Motor
    let bridge = Drv8873Bridge::new(dp.TIM4, pins.motor, 0);
    let mut motor = SensorimotorCore::new(bridge);
    let mut adc = TelemetryAdc::new(dp.ADC1, pins.sense);
    let mut sensor = NoSensor;

    let mut com = Communication::new(
        BusPort::new(bus),
        line,
        Flash::new(dp.FLASH),
        protocol::Config::default(),
    );
    com.configure(&mut motor);
    info!("sensorimotor {} ready", com.id());

    // 1 kHz control cycle
    let mut syst = cp.SYST;
    syst.set_clock_source(SystClkSource::Core);
    syst.set_reload(clocks.sysclk().raw() / CYCLE_HZ - 1);
    syst.clear_current();
    syst.enable_counter();

    loop {
        if syst.has_wrapped() {
            leds.red.on();
            motor.step(adc.sample());
            leds.red.off();

            // One watchdog pass per cycle
            if com.step(&mut motor, &mut sensor) {
                info!("update requested, entering bootloader");
                motor.halt();
                logger::flush();
                system::start_bootloader();
            }
        }

        while com.receive_command(&mut motor, &mut sensor) {}
    }
}

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    cortex_m::interrupt::disable();
    error!("{}", info);

    // Nothing else runs any more, so the peripherals can be taken over.
    let dp = unsafe { pac::Peripherals::steal() };
    let gpioa = dp.GPIOA.split();
    let gpiod = dp.GPIOD.split();

    // Motor driver off
    let mut disable = gpioa.pa3.into_push_pull_output();
    disable.set_high();

    let mut leds = StatusLeds::new(
        Led::active_low(PushPullPin::new(gpiod.pd8.into_push_pull_output())),
        Led::active_low(PushPullPin::new(gpiod.pd9.into_push_pull_output())),
    );
    let mut delay = CycleDelay::new(SYSCLK_HZ);
    let code = assertion::last().map_or(0xFF, |a| a.code());

    loop {
        leds.blink_code(code, &mut delay);
    }
}
