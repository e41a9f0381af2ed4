// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! DRV8873 H-bridge driven by TIM4 in PWM mode.
//!
//! IN1 and IN2 are TIM4 channels 1 and 2. Forward drives IN1 with the duty cycle and holds IN2
//! low; reverse swaps them. An 8-bit duty maps directly onto the 0..=255 timer period.

use stm32f7xx_hal::pac;

use super::pins::MotorPins;
use crate::motor::HBridge;

/// PWM period in timer ticks, matching the 8-bit duty range.
const PERIOD: u32 = 255;

pub struct Drv8873Bridge {
    tim: pac::TIM4,
    pins: MotorPins,
    duty: u8,
    forward: bool,
}

impl Drv8873Bridge {
    /// Configure TIM4 for edge-aligned PWM on CH1/CH2 and leave the driver disabled.
    pub fn new(tim4: pac::TIM4, pins: MotorPins, prescaler: u16) -> Self {
        let rcc = unsafe { &*pac::RCC::ptr() };
        rcc.apb1enr.modify(|_, w| w.tim4en().set_bit());

        let tim = tim4;

        // Disable counter while configuring
        tim.cr1.modify(|_, w| w.cen().clear_bit());

        tim.psc.write(|w| unsafe { w.bits(prescaler as u32) });
        tim.arr.write(|w| unsafe { w.bits(PERIOD) });

        // PWM mode 1 with preload on CH1 and CH2
        tim.ccmr1_output().write(|w| unsafe { w.bits(0x6868) });
        tim.ccer.write(|w| unsafe { w.bits(0x11) });
        tim.ccr1.write(|w| unsafe { w.bits(0) });
        tim.ccr2.write(|w| unsafe { w.bits(0) });

        // Load the shadow registers, then start with auto-reload preload
        tim.egr.write(|w| w.ug().set_bit());
        tim.cr1.modify(|_, w| w.arpe().set_bit().cen().set_bit());

        let mut bridge = Self {
            tim,
            pins,
            duty: 0,
            forward: true,
        };
        bridge.disable();
        bridge
    }

    fn update_outputs(&mut self) {
        let (a, b) = if self.forward {
            (self.duty as u32, 0)
        } else {
            (0, self.duty as u32)
        };
        self.tim.ccr1.write(|w| unsafe { w.bits(a) });
        self.tim.ccr2.write(|w| unsafe { w.bits(b) });
    }

    pub fn free(self) -> (pac::TIM4, MotorPins) {
        (self.tim, self.pins)
    }
}

impl HBridge for Drv8873Bridge {
    fn set_duty(&mut self, duty: u8) {
        self.duty = duty;
        self.update_outputs();
    }

    fn set_direction(&mut self, forward: bool) {
        self.forward = forward;
        self.update_outputs();
    }

    fn enable(&mut self) {
        self.pins.nsleep.set_high();
        self.pins.disable.set_low();
    }

    fn disable(&mut self) {
        self.duty = 0;
        self.update_outputs();
        self.pins.disable.set_high();
        self.pins.nsleep.set_low();
    }

    /// nFAULT is active low.
    #[inline]
    fn fault(&self) -> bool {
        self.pins.nfault.is_low()
    }
}
