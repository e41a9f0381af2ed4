// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Pin definitions for the STM32F777 sensorimotor board.

use stm32f7xx_hal::{
    gpio::{gpioa, gpioc, gpiod, Alternate, Analog, Floating, Input, Output, PushPull},
    pac,
    prelude::*,
};

/// All board pins. Construct this once at startup using:
///
/// ```ignore
/// let pins = BoardPins::new(dp.GPIOA, dp.GPIOC, dp.GPIOD);
/// ```
pub struct BoardPins {
    pub leds: LedPins,
    pub debug: DebugPins,
    pub bus: BusPins,
    pub motor: MotorPins,
    pub sense: SensePins,
}

/// Status LEDs, active low.
pub struct LedPins {
    pub red: gpiod::PD8<Output<PushPull>>,
    pub yellow: gpiod::PD9<Output<PushPull>>,
}

/// USART1 to the debug header.
pub struct DebugPins {
    pub tx: gpioa::PA9<Alternate<7>>,
    pub rx: gpioa::PA10<Alternate<7>>,
}

/// USART2 and direction pins of the RS-485 transceiver.
pub struct BusPins {
    pub tx: gpiod::PD5<Alternate<7>>,
    pub rx: gpiod::PD6<Alternate<7>>,
    pub drive_enable: gpiod::PD4<Output<PushPull>>,
    pub read_disable: gpiod::PD7<Output<PushPull>>,
}

/// DRV8873 H-bridge
pub struct MotorPins {
    pub in1: gpiod::PD12<Alternate<2>>, // TIM4_CH1 (PWM)
    pub in2: gpiod::PD13<Alternate<2>>, // TIM4_CH2 (PWM)
    pub nsleep: gpioa::PA4<Output<PushPull>>,
    pub disable: gpioa::PA3<Output<PushPull>>,
    pub nfault: gpioa::PA2<Input<Floating>>,
}

/// Analog inputs sampled every control cycle.
pub struct SensePins {
    pub position: gpioc::PC0<Analog>, // ADC1_IN10
    pub supply: gpioc::PC1<Analog>,   // ADC1_IN11
    pub current: gpioc::PC4<Analog>,  // ADC1_IN14
}

impl BoardPins {
    /// Create all named pins from raw GPIO peripherals.
    pub fn new(gpioa: pac::GPIOA, gpioc: pac::GPIOC, gpiod: pac::GPIOD) -> Self {
        let gpioa = gpioa.split();
        let gpioc = gpioc.split();
        let gpiod = gpiod.split();

        Self {
            leds: LedPins {
                red: gpiod.pd8.into_push_pull_output(),
                yellow: gpiod.pd9.into_push_pull_output(),
            },

            debug: DebugPins {
                tx: gpioa.pa9.into_alternate::<7>(),
                rx: gpioa.pa10.into_alternate::<7>(),
            },

            bus: BusPins {
                tx: gpiod.pd5.into_alternate::<7>(),
                rx: gpiod.pd6.into_alternate::<7>(),
                drive_enable: gpiod.pd4.into_push_pull_output(),
                read_disable: gpiod.pd7.into_push_pull_output(),
            },

            motor: MotorPins {
                in1: gpiod.pd12.into_alternate::<2>(),
                in2: gpiod.pd13.into_alternate::<2>(),
                nsleep: gpioa.pa4.into_push_pull_output(),
                disable: gpioa.pa3.into_push_pull_output(),
                nfault: gpioa.pa2.into_floating_input(),
            },

            sense: SensePins {
                position: gpioc.pc0.into_analog(),
                supply: gpioc.pc1.into_analog(),
                current: gpioc.pc4.into_analog(),
            },
        }
    }
}
