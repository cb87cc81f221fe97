//! Light controller
//!
//! Owns the serial link and the outputs. Every output gets a ticker thread
//! that composites its next color and writes it when it changed, paced so
//! that all outputs together stay within the device's command rate. A
//! heartbeat thread keeps devices that need it awake.
//!
//! All writes to the link go through one lock, compositing happens outside
//! of it.

mod worker;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use embassy_time::Duration;
use parking_lot::{Mutex, RwLock};
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::blend::Blender;
use crate::color::{BLACK, Rgb};
use crate::command::{Action, Command};
use crate::config::{ControllerConfig, HeartbeatConfig, MAX_OUTPUTS, SerialConfig};
use crate::connection::{Connection, SerialConnection};
use crate::envelope::Envelope;
use crate::error::{ConnectionError, Error, Result, ValidationError};
use crate::gamma::{GammaConfig, GammaTable};
use crate::output::{Output, OutputInfo};
use crate::protocol::{Protocol, ProtocolKind, ProtocolSlot};
use crate::scheduler::{Clock, TickScheduler, per_output_rate, period_for, std_duration};

use worker::{StopSignal, Worker};

/// An output shared between its ticker and the API
pub type SharedOutput = Arc<Mutex<Output>>;

/// State shared with the workers
struct Shared {
    link: Mutex<Box<dyn Connection>>,
    protocol: ProtocolSlot,
    device: String,
    frequency: u32,
    period_us: AtomicU64,
    outputs: RwLock<Vec<SharedOutput>>,
    gamma: RwLock<GammaTable>,
    last_output: Mutex<Option<usize>>,
    clock: Clock,
}

impl Shared {
    fn period(&self) -> Duration {
        Duration::from_micros(self.period_us.load(Ordering::Acquire))
    }

    fn update_period(&self, outputs: usize) {
        let period = period_for(outputs, self.frequency);
        self.period_us.store(period.as_micros(), Ordering::Release);
    }

    fn command(&self, frame: &[u8], verify: bool) -> core::result::Result<(), ConnectionError> {
        let mut link = self.link.lock();
        self.send(&mut **link, frame, verify)
    }

    /// Write a frame on an already locked link
    fn send(
        &self,
        link: &mut dyn Connection,
        frame: &[u8],
        verify: bool,
    ) -> core::result::Result<(), ConnectionError> {
        link.write_all(frame)?;
        link.flush()?;
        if verify {
            self.protocol.verify_response(link)?;
        }
        Ok(())
    }

    fn set_single_frame(&self, index: usize, color: Rgb) -> Result<Vec<u8>> {
        let output = u8::try_from(index).map_err(|_| ValidationError::OutputOutOfRange {
            index,
            count: MAX_OUTPUTS,
        })?;
        Ok(self.protocol.encode_set_single(output, color))
    }
}

/// Multi output light controller
pub struct Controller {
    shared: Arc<Shared>,
    layers: usize,
    tickers: Mutex<Vec<Worker>>,
    heartbeat: Mutex<Option<Worker>>,
}

impl Controller {
    /// Open the serial device and connect to the controller on it
    pub fn connect(device: &str, kind: ProtocolKind, config: ControllerConfig) -> Result<Self> {
        Self::connect_via(device, kind, config, &mut open_serial)
    }

    /// Connect to the first candidate device that answers
    pub fn connect_first(
        candidates: &[&str],
        kind: ProtocolKind,
        config: ControllerConfig,
    ) -> Result<Self> {
        Self::connect_first_with(candidates, kind, config, open_serial)
    }

    /// Like [`Controller::connect_first`], opening devices with `open`
    ///
    /// Candidates are tried in order. Connection errors move on to the next
    /// one, any other error is returned right away.
    pub fn connect_first_with<F>(
        candidates: &[&str],
        kind: ProtocolKind,
        config: ControllerConfig,
        mut open: F,
    ) -> Result<Self>
    where
        F: FnMut(&str, &SerialConfig) -> Result<Box<dyn Connection>>,
    {
        for device in candidates {
            match Self::connect_via(device, kind, config, &mut open) {
                Ok(controller) => return Ok(controller),
                Err(Error::Connection(err)) => debug!(device, error = %err, "skipping device"),
                Err(err) => return Err(err),
            }
        }
        Err(ConnectionError::NoDevice.into())
    }

    fn connect_via<F>(
        device: &str,
        kind: ProtocolKind,
        config: ControllerConfig,
        open: &mut F,
    ) -> Result<Self>
    where
        F: FnMut(&str, &SerialConfig) -> Result<Box<dyn Connection>>,
    {
        let protocol = kind.to_slot();
        info!(device, protocol = protocol.name(), "connecting");
        let connection = open(device, &protocol.serial_config())?;
        Self::open(connection, protocol, config)
    }

    /// Handshake on an opened connection and start the controller
    pub fn open(
        mut connection: Box<dyn Connection>,
        protocol: ProtocolSlot,
        config: ControllerConfig,
    ) -> Result<Self> {
        let clock = Clock::new();
        protocol.connect_handshake(&mut *connection)?;
        let device = connection.name();
        info!(
            %device,
            elapsed_ms = clock.now().as_millis(),
            "initialization done"
        );
        info!(%device, "connected");
        Self::with_connection(connection, protocol, config)
    }

    /// Start the controller on a connection that finished its handshake
    pub fn with_connection(
        mut connection: Box<dyn Connection>,
        protocol: ProtocolSlot,
        config: ControllerConfig,
    ) -> Result<Self> {
        if config.outputs > MAX_OUTPUTS {
            return Err(ValidationError::OutputLimit(MAX_OUTPUTS).into());
        }
        let gamma = GammaTable::new(config.gamma)?;
        let frequency = match config.frequency {
            Some(frequency) => frequency,
            None => protocol.detect_frequency(&mut *connection)?,
        };

        let device = connection.name();
        let shared = Arc::new(Shared {
            link: Mutex::new(connection),
            protocol,
            device,
            frequency,
            period_us: AtomicU64::new(period_for(1, frequency).as_micros()),
            outputs: RwLock::new(Vec::with_capacity(config.outputs)),
            gamma: RwLock::new(gamma),
            last_output: Mutex::new(None),
            clock: Clock::new(),
        });
        let heartbeat = match protocol.encode_heartbeat() {
            Some(frame) => Some(spawn_heartbeat(&shared, frame, config.heartbeat)?),
            None => None,
        };
        let controller = Self {
            shared,
            layers: config.layers,
            tickers: Mutex::new(Vec::with_capacity(config.outputs)),
            heartbeat: Mutex::new(heartbeat),
        };
        for _ in 0..config.outputs {
            controller.add()?;
        }
        Ok(controller)
    }

    pub fn device(&self) -> &str {
        &self.shared.device
    }

    pub fn protocol(&self) -> ProtocolSlot {
        self.shared.protocol
    }

    /// Combined command rate of the device, in Hz
    pub fn frequency(&self) -> u32 {
        self.shared.frequency
    }

    /// Time between two writes of one output
    pub fn period(&self) -> Duration {
        self.shared.period()
    }

    pub fn output_count(&self) -> usize {
        self.shared.outputs.read().len()
    }

    /// Send a raw command, optionally waiting for its acknowledgment
    ///
    /// Failures are returned as they happen, nothing is retried.
    pub fn command(&self, frame: &[u8], verify: bool) -> Result<()> {
        Ok(self.shared.command(frame, verify)?)
    }

    /// Set every output to `color` right away, bypassing the layers
    pub fn set_all(&self, color: Rgb) -> Result<()> {
        self.command(&self.shared.protocol.encode_set_all(color), true)
    }

    /// Set a single output to `color` right away, bypassing its layers
    pub fn set_single(&self, index: usize, color: Rgb) -> Result<()> {
        let frame = self.shared.set_single_frame(index, color)?;
        self.command(&frame, true)
    }

    /// Add an output and start its ticker
    ///
    /// Returns the index of the new output.
    pub fn add(&self) -> Result<usize> {
        let mut tickers = self.tickers.lock();
        let (index, output) = {
            let _link = self.shared.link.lock();
            let mut outputs = self.shared.outputs.write();
            if outputs.len() >= MAX_OUTPUTS {
                return Err(ValidationError::OutputLimit(MAX_OUTPUTS).into());
            }
            let index = outputs.len();
            let output = Arc::new(Mutex::new(Output::new(index, self.layers)));
            outputs.push(Arc::clone(&output));
            self.shared.update_period(outputs.len());
            (index, output)
        };
        info!(
            outputs = index + 1,
            frequency = per_output_rate(self.shared.frequency, index + 1),
            "individual output frequency changed"
        );

        let shared = Arc::clone(&self.shared);
        match Worker::spawn(format!("ticker-{index}"), move |stop| {
            run_ticker(&shared, &output, &stop);
        }) {
            Ok(worker) => tickers.push(worker),
            Err(err) => {
                let _link = self.shared.link.lock();
                let mut outputs = self.shared.outputs.write();
                outputs.pop();
                self.shared.update_period(outputs.len());
                return Err(err);
            }
        }
        Ok(index)
    }

    /// Remove the last output
    ///
    /// Its ticker is stopped first, then the output is switched off.
    pub fn remove(&self) -> Result<()> {
        let mut tickers = self.tickers.lock();
        let Some(mut ticker) = tickers.pop() else {
            return Err(ValidationError::NoOutputs.into());
        };
        ticker.stop();

        let mut link = self.shared.link.lock();
        let removed = {
            let mut outputs = self.shared.outputs.write();
            let removed = outputs.pop();
            self.shared.update_period(outputs.len());
            removed
        };
        let Some(removed) = removed else {
            return Err(ValidationError::NoOutputs.into());
        };
        let index = {
            let mut output = removed.lock();
            output.kill();
            output.id()
        };
        {
            let mut last = self.shared.last_output.lock();
            if *last == Some(index) {
                *last = index.checked_sub(1);
            }
        }
        info!(
            outputs = index,
            frequency = per_output_rate(self.shared.frequency, index),
            "individual output frequency changed"
        );

        let frame = self.shared.set_single_frame(index, BLACK)?;
        self.shared.send(&mut **link, &frame, true)?;
        Ok(())
    }

    /// Output at `index`, which becomes the last selected one
    pub fn output(&self, index: usize) -> Result<SharedOutput> {
        let outputs = self.shared.outputs.read();
        let output = outputs
            .get(index)
            .ok_or(ValidationError::OutputOutOfRange {
                index,
                count: outputs.len(),
            })?;
        *self.shared.last_output.lock() = Some(index);
        Ok(Arc::clone(output))
    }

    /// The output after the last selected one, wrapping around
    pub fn next_output(&self) -> Result<SharedOutput> {
        let outputs = self.shared.outputs.read();
        if outputs.is_empty() {
            return Err(ValidationError::NoOutputs.into());
        }
        let mut last = self.shared.last_output.lock();
        let index = last.map_or(0, |last| (last + 1) % outputs.len());
        *last = Some(index);
        Ok(Arc::clone(&outputs[index]))
    }

    /// A random output other than the last selected one
    ///
    /// With a single output, that output is returned.
    pub fn random_output(&self) -> Result<SharedOutput> {
        let outputs = self.shared.outputs.read();
        let count = outputs.len();
        if count == 0 {
            return Err(ValidationError::NoOutputs.into());
        }
        let mut last = self.shared.last_output.lock();
        let mut rng = rand::thread_rng();
        let index = match *last {
            _ if count == 1 => 0,
            Some(previous) if previous < count => {
                let pick = rng.gen_range(0..count - 1);
                if pick >= previous { pick + 1 } else { pick }
            }
            _ => rng.gen_range(0..count),
        };
        *last = Some(index);
        Ok(Arc::clone(&outputs[index]))
    }

    /// Run a validated command on its output
    pub fn apply(&self, command: &Command) -> Result<()> {
        let output = self.output(command.output)?;
        output.lock().apply(command.action, &command.options)?;
        Ok(())
    }

    /// Replace the output correction
    ///
    /// Every output is rewritten on its next tick with the new table.
    pub fn set_gamma(&self, config: GammaConfig) -> Result<()> {
        let table = GammaTable::new(config)?;
        *self.shared.gamma.write() = table;
        for output in self.shared.outputs.read().iter() {
            output.lock().invalidate();
        }
        debug!(
            gamma = config.gamma,
            in_bits = config.in_bits,
            out_bits = config.out_bits,
            "gamma table updated"
        );
        Ok(())
    }

    pub fn gamma(&self) -> GammaConfig {
        self.shared.gamma.read().config()
    }

    /// Controller summary for API consumers
    pub fn info(&self) -> ControllerInfo {
        let outputs = self.output_count();
        let period = self.period();
        ControllerInfo {
            controller: self.shared.protocol.name(),
            device: self.shared.device.clone(),
            command_rate: CommandRate {
                controller: self.shared.frequency,
                per_output: per_output_rate(self.shared.frequency, outputs),
            },
            period: period.as_micros() as f64 / 1_000_000.0,
            blenders: Blender::ALL.iter().map(|blender| blender.as_str()).collect(),
            actions: Action::ALL.iter().map(|action| action.as_str()).collect(),
            envelopes: Envelope::ALL.iter().map(|envelope| envelope.as_str()).collect(),
            outputs,
        }
    }

    /// State of every output and its layers
    pub fn outputs_info(&self) -> Vec<OutputInfo> {
        self.shared
            .outputs
            .read()
            .iter()
            .map(|output| output.lock().info())
            .collect()
    }

    /// Stop and join every worker
    ///
    /// The controller stops writing to the device. Calling it twice is
    /// harmless.
    pub fn shutdown(&self) {
        if let Some(mut heartbeat) = self.heartbeat.lock().take() {
            heartbeat.stop();
        }
        let mut tickers = self.tickers.lock();
        while let Some(mut ticker) = tickers.pop() {
            ticker.stop();
        }
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Command rate of the device and of a single output, in Hz
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandRate {
    pub controller: u32,
    pub per_output: f64,
}

/// Controller state as reported to API consumers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerInfo {
    /// Protocol the device speaks
    pub controller: &'static str,
    pub device: String,
    pub command_rate: CommandRate,
    /// Seconds between two writes of one output
    pub period: f64,
    pub blenders: Vec<&'static str>,
    pub actions: Vec<&'static str>,
    pub envelopes: Vec<&'static str>,
    pub outputs: usize,
}

fn open_serial(device: &str, config: &SerialConfig) -> Result<Box<dyn Connection>> {
    Ok(Box::new(SerialConnection::open(device, config)?))
}

fn spawn_heartbeat(shared: &Arc<Shared>, frame: Vec<u8>, config: HeartbeatConfig) -> Result<Worker> {
    let shared = Arc::clone(shared);
    Worker::spawn("heartbeat".to_owned(), move |stop| {
        run_heartbeat(&shared, &frame, config, &stop);
    })
}

fn run_heartbeat(shared: &Shared, frame: &[u8], config: HeartbeatConfig, stop: &StopSignal) {
    if stop.wait(std_duration(config.delay)) {
        return;
    }
    loop {
        let delay = match shared.command(frame, false) {
            Ok(()) => config.delay,
            Err(err) => {
                warn!(error = %err, "heartbeat failed");
                config.fail_delay
            }
        };
        if stop.wait(std_duration(delay)) {
            return;
        }
    }
}

fn run_ticker(shared: &Shared, output: &Mutex<Output>, stop: &StopSignal) {
    let mut scheduler = TickScheduler::new();
    let mut failing = false;
    loop {
        scheduler.begin(shared.clock.now());
        let (index, color) = {
            let gamma = shared.gamma.read();
            let mut output = output.lock();
            (output.id(), output.write_if_changed(&gamma))
        };
        if let Some(color) = color {
            let sent = shared
                .set_single_frame(index, color)
                .and_then(|frame| shared.command(&frame, true).map_err(Error::from));
            match sent {
                Ok(()) if failing => {
                    failing = false;
                    info!(output = index, "output writes recovered");
                }
                Ok(()) => {}
                Err(err) => {
                    // only the first failure of a run is a warning, retries
                    // happen every tick
                    if failing {
                        debug!(output = index, error = %err, "output write retry failed");
                    } else {
                        failing = true;
                        warn!(output = index, error = %err, "could not write output");
                    }
                    output.lock().invalidate();
                }
            }
        }
        let tick = scheduler.finish(shared.clock.now(), shared.period());
        if stop.wait(std_duration(tick.sleep_duration)) {
            return;
        }
    }
}
