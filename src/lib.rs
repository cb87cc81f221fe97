pub mod blend;
pub mod color;
pub mod command;
pub mod config;
pub mod connection;
pub mod controller;
pub mod envelope;
pub mod error;
pub mod gamma;
pub mod layer;
pub mod output;
pub mod protocol;
pub mod scheduler;
pub mod transition;

pub use blend::Blender;
pub use command::{Action, ColorValue, Command, CommandOptions, CommandRequest};
pub use config::{ControllerConfig, HeartbeatConfig, SerialConfig};
pub use connection::{Connection, SerialConnection};
pub use controller::{CommandRate, Controller, ControllerInfo, SharedOutput};
pub use envelope::Envelope;
pub use error::{ConnectionError, Error, Result, ValidationError};
pub use gamma::{GammaConfig, GammaTable};
pub use layer::{Layer, LayerInfo, Step};
pub use output::{Output, OutputInfo};
pub use protocol::{BinaryProtocol, Protocol, ProtocolKind, ProtocolSlot, TextProtocol};
pub use transition::{RunningTransition, Transition};

pub use color::{Lab, Rgb};
pub use embassy_time::{Duration, Instant};
