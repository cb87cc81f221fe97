use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use crate::error::Error;

/// Stop request as seen from inside a worker
pub(crate) struct StopSignal {
    receiver: Receiver<()>,
}

impl StopSignal {
    /// Sleep for `timeout`, returning `true` early once a stop was requested
    pub(crate) fn wait(&self, timeout: std::time::Duration) -> bool {
        match self.receiver.recv_timeout(timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => true,
            Err(RecvTimeoutError::Timeout) => false,
        }
    }
}

/// A named background thread that can be stopped and joined
pub(crate) struct Worker {
    name: String,
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    pub(crate) fn spawn<F>(name: String, run: F) -> Result<Self, Error>
    where
        F: FnOnce(StopSignal) + Send + 'static,
    {
        let (stop, receiver) = mpsc::channel();
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || run(StopSignal { receiver }))
            .map_err(Error::Worker)?;
        debug!(worker = %name, "worker started");
        Ok(Self {
            name,
            stop: Some(stop),
            handle: Some(handle),
        })
    }

    /// Signal the worker and wait for it to finish
    pub(crate) fn stop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!(worker = %self.name, "worker panicked");
            }
            debug!(worker = %self.name, "worker stopped");
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.stop();
    }
}
