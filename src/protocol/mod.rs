//! Wire protocols
//!
//! Every controller speaks one of a closed set of protocols. They share
//! the [`Protocol`] interface and are stored in a [`ProtocolSlot`], picked
//! once when the controller is constructed.

mod binary;
mod text;

pub use binary::{BANNER, BINARY_COMMAND_RATE, BinaryProtocol};
pub use text::{ACKNOWLEDGMENT, HANDSHAKE_ATTEMPTS, TextProtocol};

use crate::color::Rgb;
use crate::config::SerialConfig;
use crate::connection::{Connection, read_response};
use crate::error::ConnectionError;

const PROTOCOL_NAME_TEXT: &str = "text";
const PROTOCOL_NAME_BINARY: &str = "binary";

pub trait Protocol {
    /// Name used in logs and reports
    fn name(&self) -> &'static str;

    /// Serial line settings the device expects
    fn serial_config(&self) -> SerialConfig;

    /// Command setting every output to `color`
    fn encode_set_all(&self, color: Rgb) -> Vec<u8>;

    /// Command setting a single output to `color`
    fn encode_set_single(&self, output: u8, color: Rgb) -> Vec<u8>;

    /// Keepalive command, if the device needs one
    fn encode_heartbeat(&self) -> Option<Vec<u8>> {
        None
    }

    /// Reply the device sends after a color command, if any
    fn acknowledgment(&self) -> Option<&'static [u8]> {
        None
    }

    /// Check that the device acknowledged the last command
    fn verify_response(&self, conn: &mut dyn Connection) -> Result<(), ConnectionError> {
        let Some(expected) = self.acknowledgment() else {
            return Ok(());
        };
        let received = read_response(conn, expected.len())?;
        if received != expected {
            return Err(ConnectionError::Acknowledgment { expected, received });
        }
        Ok(())
    }

    /// Make sure a freshly opened link talks to the right kind of device
    fn connect_handshake(&self, conn: &mut dyn Connection) -> Result<(), ConnectionError>;

    /// Number of commands per second the device handles
    fn detect_frequency(&self, conn: &mut dyn Connection) -> Result<u32, ConnectionError>;
}

/// Known protocols
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ProtocolKind {
    #[default]
    Text,
    Binary,
}

impl ProtocolKind {
    pub const ALL: [Self; 2] = [Self::Text, Self::Binary];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => PROTOCOL_NAME_TEXT,
            Self::Binary => PROTOCOL_NAME_BINARY,
        }
    }

    pub fn parse_from_str(s: &str) -> Option<Self> {
        match s {
            PROTOCOL_NAME_TEXT => Some(Self::Text),
            PROTOCOL_NAME_BINARY => Some(Self::Binary),
            _ => None,
        }
    }

    pub const fn to_slot(self) -> ProtocolSlot {
        match self {
            Self::Text => ProtocolSlot::Text(TextProtocol),
            Self::Binary => ProtocolSlot::Binary(BinaryProtocol),
        }
    }
}

/// Protocol slot - enum holding the protocol a controller speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolSlot {
    Text(TextProtocol),
    Binary(BinaryProtocol),
}

impl ProtocolSlot {
    pub const fn kind(&self) -> ProtocolKind {
        match self {
            Self::Text(_) => ProtocolKind::Text,
            Self::Binary(_) => ProtocolKind::Binary,
        }
    }

    fn inner(&self) -> &dyn Protocol {
        match self {
            Self::Text(protocol) => protocol,
            Self::Binary(protocol) => protocol,
        }
    }
}

impl From<ProtocolKind> for ProtocolSlot {
    fn from(kind: ProtocolKind) -> Self {
        kind.to_slot()
    }
}

impl Protocol for ProtocolSlot {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    fn serial_config(&self) -> SerialConfig {
        self.inner().serial_config()
    }

    fn encode_set_all(&self, color: Rgb) -> Vec<u8> {
        self.inner().encode_set_all(color)
    }

    fn encode_set_single(&self, output: u8, color: Rgb) -> Vec<u8> {
        self.inner().encode_set_single(output, color)
    }

    fn encode_heartbeat(&self) -> Option<Vec<u8>> {
        self.inner().encode_heartbeat()
    }

    fn acknowledgment(&self) -> Option<&'static [u8]> {
        self.inner().acknowledgment()
    }

    fn verify_response(&self, conn: &mut dyn Connection) -> Result<(), ConnectionError> {
        self.inner().verify_response(conn)
    }

    fn connect_handshake(&self, conn: &mut dyn Connection) -> Result<(), ConnectionError> {
        self.inner().connect_handshake(conn)
    }

    fn detect_frequency(&self, conn: &mut dyn Connection) -> Result<u32, ConnectionError> {
        self.inner().detect_frequency(conn)
    }
}
