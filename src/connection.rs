//! Byte level link to the controller hardware

use std::io::{self, Read, Write};
use std::thread;

use embassy_time::Duration;
use serialport::{ClearBuffer, SerialPort};
use tracing::debug;

use crate::config::SerialConfig;
use crate::error::ConnectionError;
use crate::scheduler::std_duration;

/// How long the reset line is held low
const RESET_PULSE: Duration = Duration::from_millis(50);

/// A bidirectional byte stream to a controller
///
/// Reads honor the timeout set with [`Connection::set_timeout`] and fail
/// with [`io::ErrorKind::TimedOut`] when nothing arrived in time.
pub trait Connection: Read + Write + Send {
    /// Set the read timeout
    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()>;

    /// Drop whatever is waiting in the input buffer
    fn clear_input(&mut self) -> io::Result<()>;

    /// Pulse the reset line of the device
    fn pulse_reset(&mut self) -> io::Result<()>;

    /// Human readable name of the link
    fn name(&self) -> String;
}

/// Read up to `len` bytes, stopping early when the read times out
pub fn read_response<C: Connection + ?Sized>(conn: &mut C, len: usize) -> io::Result<Vec<u8>> {
    let mut buf = vec![0; len];
    let mut filled = 0;
    while filled < len {
        match conn.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) if err.kind() == io::ErrorKind::TimedOut => break,
            Err(err) => return Err(err),
        }
    }
    buf.truncate(filled);
    Ok(buf)
}

/// A connection over a serial port
pub struct SerialConnection {
    port: Box<dyn SerialPort>,
    device: String,
}

impl SerialConnection {
    /// Open the serial device with the given line settings
    pub fn open(device: &str, config: &SerialConfig) -> Result<Self, ConnectionError> {
        debug!(device, baud_rate = config.baud_rate, "opening serial device");
        let port = serialport::new(device, config.baud_rate)
            .timeout(std_duration(config.open_timeout))
            .open()
            .map_err(|err| ConnectionError::Open {
                device: device.to_owned(),
                reason: err.to_string(),
            })?;
        Ok(Self {
            port,
            device: device.to_owned(),
        })
    }
}

impl Read for SerialConnection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf)
    }
}

impl Write for SerialConnection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.port.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.port.flush()
    }
}

impl Connection for SerialConnection {
    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.port.set_timeout(std_duration(timeout))?;
        Ok(())
    }

    fn clear_input(&mut self) -> io::Result<()> {
        self.port.clear(ClearBuffer::Input)?;
        Ok(())
    }

    fn pulse_reset(&mut self) -> io::Result<()> {
        self.port.write_data_terminal_ready(false)?;
        thread::sleep(std_duration(RESET_PULSE));
        self.port.write_data_terminal_ready(true)?;
        Ok(())
    }

    fn name(&self) -> String {
        self.device.clone()
    }
}
