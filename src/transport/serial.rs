//! Serial port backend

use std::io;
use std::time::Duration;

use serialport::{ClearBuffer, SerialPort};
use tracing::info;

use super::Link;
use crate::error::Result;

/// Open the token's serial port
pub fn open_serial_port(path: &str, baud_rate: u32, timeout: Duration) -> Result<Box<dyn SerialPort>> {
    let port = serialport::new(path, baud_rate).timeout(timeout).open()?;
    info!(port = path, baud_rate, "serial port opened");
    Ok(port)
}

/// Where the token usually shows up on this platform
pub fn default_port() -> Option<&'static str> {
    if cfg!(target_os = "linux") {
        Some("/dev/ttyUSB0")
    } else if cfg!(target_os = "macos") {
        Some("/dev/cu.usbmodemHIDP1")
    } else {
        None
    }
}

impl Link for Box<dyn SerialPort> {
    fn set_read_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.set_timeout(timeout).map_err(io::Error::from)
    }

    fn clear_input(&mut self) -> io::Result<()> {
        self.clear(ClearBuffer::Input).map_err(io::Error::from)
    }
}
