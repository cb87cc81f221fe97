use embassy_time::Duration;
use tracing::debug;

use super::Protocol;
use crate::color::Rgb;
use crate::config::SerialConfig;
use crate::connection::{Connection, read_response};
use crate::error::ConnectionError;

/// Greeting the device prints after a reset
pub const BANNER: &[u8] = b"[Lightbox]";

/// Command rate assumed for binary devices, in Hz
pub const BINARY_COMMAND_RATE: u32 = 200;

const TYPE_SET_ALL: u8 = 0x01;
const TYPE_SET_SINGLE: u8 = 0x02;

/// Compact type-length-value protocol
///
/// Every command is a type byte, a length byte and the raw values. Nothing
/// is acknowledged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BinaryProtocol;

impl Protocol for BinaryProtocol {
    fn name(&self) -> &'static str {
        super::PROTOCOL_NAME_BINARY
    }

    fn serial_config(&self) -> SerialConfig {
        SerialConfig {
            baud_rate: 115_200,
            open_timeout: Duration::from_secs(2),
            read_timeout: Duration::from_millis(100),
        }
    }

    fn encode_set_all(&self, color: Rgb) -> Vec<u8> {
        vec![TYPE_SET_ALL, 3, color.r, color.g, color.b]
    }

    fn encode_set_single(&self, output: u8, color: Rgb) -> Vec<u8> {
        vec![TYPE_SET_SINGLE, 4, output, color.r, color.g, color.b]
    }

    fn connect_handshake(&self, conn: &mut dyn Connection) -> Result<(), ConnectionError> {
        conn.set_timeout(self.serial_config().open_timeout)?;
        conn.clear_input()?;
        conn.pulse_reset()?;
        let banner = read_response(conn, BANNER.len())?;
        if banner != BANNER {
            let device = conn.name();
            debug!(%device, received = %banner.escape_ascii(), "unexpected banner");
            return Err(ConnectionError::Handshake {
                device,
                protocol: self.name(),
            });
        }
        conn.set_timeout(self.serial_config().read_timeout)?;
        Ok(())
    }

    /// Unacknowledged writes only measure the line buffer, so the rate is
    /// fixed
    fn detect_frequency(&self, _conn: &mut dyn Connection) -> Result<u32, ConnectionError> {
        Ok(BINARY_COMMAND_RATE)
    }
}
