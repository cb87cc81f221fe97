//! Error taxonomy
//!
//! Two families: [`ConnectionError`] for anything that goes wrong on the
//! serial link, and [`ValidationError`] for malformed commands. Neither is
//! retried where it is raised.

use thiserror::Error;

/// A problem talking to the light controller hardware.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The serial device could not be opened.
    #[error("could not open device {device}: {reason}")]
    Open { device: String, reason: String },

    /// Reading from or writing to the link failed.
    #[error("could not send command: {0}")]
    Io(#[from] std::io::Error),

    /// The device did not answer the connect handshake as expected.
    #[error("device {device} is not a proper {protocol} controller")]
    Handshake {
        device: String,
        protocol: &'static str,
    },

    /// A command was answered with something other than the acknowledgment.
    #[error(
        "incorrect acknowledgment: expected {} got {}",
        .expected.escape_ascii(),
        .received.escape_ascii()
    )]
    Acknowledgment {
        expected: &'static [u8],
        received: Vec<u8>,
    },

    /// None of the candidate devices turned out to be a controller.
    #[error("no suitable device found")]
    NoDevice,
}

/// A command that was rejected before anything was applied.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("unknown blender {0:?}")]
    UnknownBlender(String),

    #[error("unknown envelope {0:?}")]
    UnknownEnvelope(String),

    #[error("unknown action {0:?}")]
    UnknownAction(String),

    #[error("steps must be at least 1, got {0}")]
    InvalidSteps(i64),

    #[error("blink count must be at least 1, got {0}")]
    InvalidCount(i64),

    #[error("opacity must be within 0..=1, got {0}")]
    OpacityOutOfRange(f32),

    #[error("hex color must be 3 or 6 hex digits, got {0:?}")]
    InvalidHexColor(String),

    #[error("output {index} does not exist ({count} outputs)")]
    OutputOutOfRange { index: usize, count: usize },

    #[error("layer {index} does not exist ({count} layers)")]
    LayerOutOfRange { index: usize, count: usize },

    #[error("may not remove the last layer")]
    LastLayer,

    #[error("an output holds at most {0} layers")]
    LayerLimit(usize),

    #[error("a controller drives at most {0} outputs")]
    OutputLimit(usize),

    #[error("controller has no outputs")]
    NoOutputs,

    #[error("layer queue has room for {free} transitions, {needed} requested")]
    QueueFull { needed: usize, free: usize },

    #[error("gamma table bits must be within 1..=8 (in {in_bits}, out {out_bits})")]
    InvalidGammaBits { in_bits: u8, out_bits: u8 },

    #[error("gamma must be a positive finite number, got {0}")]
    InvalidGamma(f32),
}

/// Any error surfaced by the crate.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A background worker thread could not be started.
    #[error("could not start worker thread: {0}")]
    Worker(#[source] std::io::Error),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Connection(ConnectionError::Io(err))
    }
}

pub type Result<T> = core::result::Result<T, Error>;
