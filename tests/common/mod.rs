//! Scripted in-memory device shared by the integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::Arc;
use std::thread;
use std::time::{Duration as StdDuration, Instant as StdInstant};

use embassy_time::Duration;
use lightbox::Connection;
use parking_lot::Mutex;

pub const ACK: &[u8] = b"R\r\n";

/// Route library logs to the test output
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Debug, Default)]
pub struct MockState {
    /// Every write, in order
    pub frames: Vec<Vec<u8>>,
    /// Only count writes instead of keeping them
    pub count_only: bool,
    /// Number of successful writes
    pub written: usize,
    /// Bytes waiting to be read
    pub input: VecDeque<u8>,
    /// Acknowledge `#` and `$` commands
    pub ack: bool,
    /// Fail every write
    pub fail_writes: bool,
    /// Number of writes that failed
    pub failed_writes: usize,
    /// Sent after a reset pulse
    pub banner: Option<Vec<u8>>,
    pub resets: usize,
    pub timeout: Option<Duration>,
    pub name: Option<String>,
}

/// Emulates a controller device
#[derive(Debug, Clone, Default)]
pub struct MockConnection {
    state: Arc<Mutex<MockState>>,
}

impl MockConnection {
    /// A text protocol device that acknowledges every color command
    pub fn text() -> Self {
        let mock = Self::default();
        mock.state.lock().ack = true;
        mock
    }

    /// A binary protocol device that greets after a reset
    pub fn binary() -> Self {
        let mock = Self::default();
        mock.state.lock().banner = Some(b"[Lightbox]".to_vec());
        mock
    }

    /// A device that never answers
    pub fn silent() -> Self {
        Self::default()
    }

    /// Report `name` as the device name
    pub fn named(self, name: &str) -> Self {
        self.state.lock().name = Some(name.to_owned());
        self
    }

    /// Count writes without keeping them, for long write loops
    pub fn count_only(self) -> Self {
        self.state.lock().count_only = true;
        self
    }

    pub fn boxed(&self) -> Box<dyn Connection> {
        Box::new(self.clone())
    }

    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.state.lock().frames.clone()
    }

    pub fn written(&self) -> usize {
        self.state.lock().written
    }

    pub fn has_frame(&self, frame: &[u8]) -> bool {
        self.state.lock().frames.iter().any(|written| written == frame)
    }

    pub fn clear_frames(&self) {
        self.state.lock().frames.clear();
    }

    pub fn push_input(&self, bytes: &[u8]) {
        self.state.lock().input.extend(bytes.iter().copied());
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.state.lock().fail_writes = fail;
    }

    pub fn failed_writes(&self) -> usize {
        self.state.lock().failed_writes
    }

    pub fn resets(&self) -> usize {
        self.state.lock().resets
    }

    /// Poll until `frame` was written, up to `timeout`
    pub fn wait_for_frame(&self, frame: &[u8], timeout: StdDuration) -> bool {
        let deadline = StdInstant::now() + timeout;
        while StdInstant::now() < deadline {
            if self.has_frame(frame) {
                return true;
            }
            thread::sleep(StdDuration::from_millis(5));
        }
        self.has_frame(frame)
    }
}

impl Read for MockConnection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state.lock();
        if state.input.is_empty() {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "no data"));
        }
        let mut count = 0;
        while count < buf.len() {
            let Some(byte) = state.input.pop_front() else {
                break;
            };
            buf[count] = byte;
            count += 1;
        }
        Ok(count)
    }
}

impl Write for MockConnection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.state.lock();
        if state.fail_writes {
            state.failed_writes += 1;
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged"));
        }
        state.written += 1;
        if !state.count_only {
            state.frames.push(buf.to_vec());
        }
        if state.ack && matches!(buf.first(), Some(b'#' | b'$')) {
            state.input.extend(ACK.iter().copied());
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Connection for MockConnection {
    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.state.lock().timeout = Some(timeout);
        Ok(())
    }

    fn clear_input(&mut self) -> io::Result<()> {
        self.state.lock().input.clear();
        Ok(())
    }

    fn pulse_reset(&mut self) -> io::Result<()> {
        let mut state = self.state.lock();
        state.resets += 1;
        if let Some(banner) = state.banner.clone() {
            state.input.extend(banner);
        }
        Ok(())
    }

    fn name(&self) -> String {
        self.state.lock().name.clone().unwrap_or_else(|| "mock".to_owned())
    }
}
