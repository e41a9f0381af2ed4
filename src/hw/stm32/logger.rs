// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! `log` backend writing to the debug USART.

use core::cell::RefCell;
use core::fmt::Write;

use cortex_m::interrupt::{self, Mutex};
use log::{LevelFilter, Log, Metadata, Record};
use stm32f7xx_hal::pac;

use super::usart::Usart;

type DebugUsart = Usart<pac::USART1>;

static SINK: Mutex<RefCell<Option<DebugUsart>>> = Mutex::new(RefCell::new(None));
static LOGGER: DebugLogger = DebugLogger;

struct DebugLogger;

impl Log for DebugLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        interrupt::free(|cs| {
            // A panic raised while printing must not print again.
            if let Ok(mut sink) = SINK.borrow(cs).try_borrow_mut() {
                if let Some(usart) = sink.as_mut() {
                    let _ = writeln!(usart, "[{}] {}\r", record.level(), record.args());
                }
            }
        });
    }

    fn flush(&self) {
        interrupt::free(|cs| {
            if let Ok(mut sink) = SINK.borrow(cs).try_borrow_mut() {
                if let Some(usart) = sink.as_mut() {
                    usart.flush();
                }
            }
        });
    }
}

/// Route `log` output to `usart`. Later calls only swap the terminal.
pub fn init(usart: DebugUsart, level: LevelFilter) {
    interrupt::free(|cs| SINK.borrow(cs).replace(Some(usart)));
    // Fails only if a logger is already installed, which is then ours.
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(level);
}

/// Drain pending output, e.g. before a control transfer.
pub fn flush() {
    log::logger().flush();
}
