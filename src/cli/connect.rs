//! Opening the serial link and greeting the token

use std::io::{self, Write};
use std::thread;

use colored::Colorize;
use serialport::SerialPort;
use tracing::debug;

use crate::config::Config;
use crate::error::Result;
use crate::protocol::{CommandSession, SessionOptions};
use crate::transport::open_serial_port;

pub type SerialSession = CommandSession<Box<dyn SerialPort>>;

/// Open the configured port, wait for the token to boot and say hi
pub fn run(config: &Config) -> Result<SerialSession> {
    let path = config.port_path()?;

    print!("{} ", format!("Contacting LLAVERO on {}...", path).cyan());
    io::stdout().flush()?;

    let port = open_serial_port(&path, config.baud_rate, config.read_timeout())?;

    // Opening the port resets the token
    debug!(delay = ?config.boot_delay(), "waiting for the device to boot");
    thread::sleep(config.boot_delay());

    let (session, greeting) = CommandSession::connect(port, SessionOptions::from(config))?;
    println!("{}", "connected".green());
    println!("{}", greeting);

    Ok(session)
}
