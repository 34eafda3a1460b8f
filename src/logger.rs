//! `log` backend on the serial console.

use core::fmt::{self, Write};

use log::Level;
#[cfg(target_arch = "x86")]
use log::{LevelFilter, Log, Metadata, Record};

/// Write one `[LEVEL] target: message` line.
pub fn write_record<W: Write>(
    out: &mut W,
    level: Level,
    target: &str,
    args: fmt::Arguments<'_>,
) -> fmt::Result {
    writeln!(out, "[{:<5}] {}: {}", level, target, args)
}

/// Forwards records to COM1. Records are dropped rather than waited on when
/// the port is busy, so logging from an interrupt handler cannot deadlock
/// against a foreground `println!`.
#[cfg(target_arch = "x86")]
pub struct SerialLogger {
    level: LevelFilter,
}

#[cfg(target_arch = "x86")]
impl Log for SerialLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        if let Some(mut serial) = crate::serial::SERIAL.try_lock() {
            let _ = write_record(&mut *serial, record.level(), record.target(), *record.args());
        }
    }

    fn flush(&self) {}
}

#[cfg(target_arch = "x86")]
static LOGGER: SerialLogger = SerialLogger {
    level: if cfg!(debug_assertions) { LevelFilter::Trace } else { LevelFilter::Info },
};

/// Install the logger on COM1, which must already be initialized. Fails if
/// a logger is already set.
#[cfg(target_arch = "x86")]
pub fn init() -> Result<(), &'static str> {
    log::set_logger(&LOGGER)
        .map(|()| log::set_max_level(LOGGER.level))
        .map_err(|_| "logger already installed")
}
