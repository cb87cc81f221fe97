use embassy_time::Duration;
use tracing::{debug, info};

use super::Protocol;
use crate::color::{BLACK, Rgb};
use crate::config::SerialConfig;
use crate::connection::{Connection, read_response};
use crate::error::ConnectionError;
use crate::scheduler::Clock;

/// Reply to every color command
pub const ACKNOWLEDGMENT: &[u8] = b"R\r\n";

/// Number of black-outs sent while waiting for the first acknowledgment
pub const HANDSHAKE_ATTEMPTS: usize = 5;

const HEARTBEAT: &[u8] = b"H\n";
const PROBE_DURATION: Duration = Duration::from_secs(1);

/// Human readable protocol
///
/// Commands are comma separated decimals terminated by a newline, every
/// color command is acknowledged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextProtocol;

impl Protocol for TextProtocol {
    fn name(&self) -> &'static str {
        super::PROTOCOL_NAME_TEXT
    }

    fn serial_config(&self) -> SerialConfig {
        SerialConfig {
            baud_rate: 57_600,
            open_timeout: Duration::from_secs(1),
            read_timeout: Duration::from_millis(100),
        }
    }

    fn encode_set_all(&self, color: Rgb) -> Vec<u8> {
        format!("#{},{},{}\n", color.r, color.g, color.b).into_bytes()
    }

    fn encode_set_single(&self, output: u8, color: Rgb) -> Vec<u8> {
        format!("${},{},{},{}\n", output, color.r, color.g, color.b).into_bytes()
    }

    fn encode_heartbeat(&self) -> Option<Vec<u8>> {
        Some(HEARTBEAT.to_vec())
    }

    fn acknowledgment(&self) -> Option<&'static [u8]> {
        Some(ACKNOWLEDGMENT)
    }

    /// The device needs a moment after opening. Whatever it sent by then
    /// is dropped, then black-outs are sent until one gets acknowledged.
    fn connect_handshake(&self, conn: &mut dyn Connection) -> Result<(), ConnectionError> {
        let device = conn.name();
        let config = self.serial_config();
        conn.set_timeout(config.open_timeout)?;
        conn.clear_input()?;
        let leftover = read_response(conn, 1)?;
        debug!(%device, leftover = leftover.len(), "input buffer drained");

        conn.set_timeout(config.read_timeout)?;
        let blackout = self.encode_set_all(BLACK);
        for attempt in 1..=HANDSHAKE_ATTEMPTS {
            conn.write_all(&blackout)?;
            conn.flush()?;
            if read_response(conn, ACKNOWLEDGMENT.len())? == ACKNOWLEDGMENT {
                debug!(%device, attempt, "handshake acknowledged");
                return Ok(());
            }
        }
        Err(ConnectionError::Handshake {
            device,
            protocol: self.name(),
        })
    }

    /// Count the black-outs the device acknowledges within one second
    fn detect_frequency(&self, conn: &mut dyn Connection) -> Result<u32, ConnectionError> {
        let clock = Clock::new();
        let blackout = self.encode_set_all(BLACK);
        let mut frequency = 0_u32;
        while clock.now().as_micros() < PROBE_DURATION.as_micros() {
            conn.write_all(&blackout)?;
            conn.flush()?;
            self.verify_response(conn)?;
            frequency += 1;
        }
        info!(frequency, "controller frequency detected");
        Ok(frequency)
    }
}
