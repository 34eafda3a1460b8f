//! COM1 serial console.

use spin::Mutex;
use uart_16550::SerialPort;

pub const COM1: u16 = 0x3F8;

pub static SERIAL: Mutex<SerialPort> = Mutex::new(unsafe { SerialPort::new(COM1) });

pub fn init() {
    SERIAL.lock().init();
}

/// Grab the console even if the interrupted foreground holds it.
///
/// # Safety
///
/// Only for the fatal path, which never returns to the lock holder.
pub unsafe fn force_unlock() {
    if SERIAL.is_locked() {
        SERIAL.force_unlock();
    }
}

#[macro_export]
macro_rules! println {
    () => {{
        $crate::println!("")
    }};
    ($($arg:tt)*) => {{
        use core::fmt::Write;
        let mut serial = $crate::serial::SERIAL.lock();
        let _ = writeln!(serial, $($arg)*);
    }};
}

#[macro_export]
macro_rules! print {
    ($($arg:tt)*) => {{
        use core::fmt::Write;
        let mut serial = $crate::serial::SERIAL.lock();
        let _ = write!(serial, $($arg)*);
    }};
}
