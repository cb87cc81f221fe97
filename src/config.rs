use embassy_time::Duration;

use crate::gamma::GammaConfig;
use crate::output::DEFAULT_LAYERS;

/// Number of outputs a controller starts with
pub const DEFAULT_OUTPUTS: usize = 5;

/// Output numbers travel as a single byte on the binary link
pub const MAX_OUTPUTS: usize = u8::MAX as usize + 1;

/// Serial devices tried by `Controller::connect_first`
pub const DEFAULT_CANDIDATES: [&str; 10] = [
    "/dev/ttyUSB0",
    "/dev/ttyUSB1",
    "/dev/ttyUSB2",
    "/dev/ttyUSB3",
    "/dev/ttyUSB4",
    "/dev/ttyUSB5",
    "/dev/ttyUSB6",
    "/dev/ttyUSB7",
    "/dev/ttyUSB8",
    "/dev/ttyUSB9",
];

/// Keepalive pacing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatConfig {
    /// Wait before the first heartbeat and between successful ones
    pub delay: Duration,
    /// Wait after a heartbeat failed to send
    pub fail_delay: Duration,
}

impl HeartbeatConfig {
    pub const DEFAULT: Self = Self {
        delay: Duration::from_secs(5),
        fail_delay: Duration::from_secs(1),
    };
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Serial line settings of a protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialConfig {
    pub baud_rate: u32,
    /// Read timeout while the device settles after opening
    pub open_timeout: Duration,
    /// Read timeout for acknowledgments
    pub read_timeout: Duration,
}

/// Controller construction parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerConfig {
    /// Number of outputs to create
    pub outputs: usize,
    /// Number of layers per output
    pub layers: usize,
    /// Known command rate in Hz, skips probing the device when set
    pub frequency: Option<u32>,
    pub heartbeat: HeartbeatConfig,
    pub gamma: GammaConfig,
}

impl ControllerConfig {
    #[must_use]
    pub const fn with_outputs(mut self, outputs: usize) -> Self {
        self.outputs = outputs;
        self
    }

    #[must_use]
    pub const fn with_layers(mut self, layers: usize) -> Self {
        self.layers = layers;
        self
    }

    #[must_use]
    pub const fn with_frequency(mut self, frequency: u32) -> Self {
        self.frequency = Some(frequency);
        self
    }

    #[must_use]
    pub const fn with_heartbeat(mut self, heartbeat: HeartbeatConfig) -> Self {
        self.heartbeat = heartbeat;
        self
    }

    #[must_use]
    pub const fn with_gamma(mut self, gamma: GammaConfig) -> Self {
        self.gamma = gamma;
        self
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            outputs: DEFAULT_OUTPUTS,
            layers: DEFAULT_LAYERS,
            frequency: None,
            heartbeat: HeartbeatConfig::DEFAULT,
            gamma: GammaConfig::LINEAR,
        }
    }
}
