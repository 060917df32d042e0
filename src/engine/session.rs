//! Thread orchestration for one generator session
//!
//! Spawns the control and generator threads (plus an optional watchdog),
//! blocks the main thread on the shutdown signal and joins everything.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, info, warn};

use super::{Generator, Pacing, Shutdown};
use crate::control::{run_control, DisplayRenderer, InputSource};
use crate::params::ParamStore;
use crate::platform::SampleSink;

/// Builder for a running session
pub struct Session {
    store: Arc<ParamStore>,
    shutdown: Shutdown,
    pacing: Pacing,
    watchdog: Option<Duration>,
}

impl Session {
    pub fn new(store: Arc<ParamStore>, shutdown: Shutdown) -> Self {
        Self {
            store,
            shutdown,
            pacing: Pacing::default(),
            watchdog: None,
        }
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    /// Signal shutdown on our own after `duration`
    pub fn with_watchdog(mut self, duration: Duration) -> Self {
        self.watchdog = Some(duration);
        self
    }

    /// Start the worker threads
    ///
    /// If a later thread fails to spawn, shutdown is signaled and the threads
    /// already running are joined before the error is returned.
    pub fn spawn<I, D, S>(
        self,
        input: I,
        display: D,
        sink: S,
    ) -> Result<SessionHandle, anyhow::Error>
    where
        I: InputSource + 'static,
        D: DisplayRenderer + 'static,
        S: SampleSink + 'static,
    {
        let mut handle = SessionHandle {
            store: self.store.clone(),
            shutdown: self.shutdown.clone(),
            workers: Vec::new(),
        };

        let store = self.store.clone();
        let shutdown = self.shutdown.clone();
        let pacing = self.pacing;
        let spawned = thread::Builder::new()
            .name("wavegen-generator".into())
            .spawn(move || Generator::new(store, sink, shutdown).with_pacing(pacing).run());
        handle.push("generator", spawned)?;

        let store = self.store.clone();
        let shutdown = self.shutdown.clone();
        let spawned = thread::Builder::new()
            .name("wavegen-control".into())
            .spawn(move || run_control(&store, input, display, &shutdown));
        handle.push("control", spawned)?;

        if let Some(duration) = self.watchdog {
            let shutdown = self.shutdown.clone();
            let spawned = thread::Builder::new()
                .name("wavegen-watchdog".into())
                .spawn(move || {
                    if !shutdown.wait_timeout(duration) {
                        info!("Watchdog expired after {:?}", duration);
                        shutdown.signal();
                    }
                    Ok(())
                });
            handle.push("watchdog", spawned)?;
        }

        Ok(handle)
    }
}

type Worker = (&'static str, JoinHandle<Result<(), anyhow::Error>>);

/// Running session; `wait` blocks until it has fully stopped
pub struct SessionHandle {
    store: Arc<ParamStore>,
    shutdown: Shutdown,
    workers: Vec<Worker>,
}

impl SessionHandle {
    fn push(
        &mut self,
        name: &'static str,
        spawned: std::io::Result<JoinHandle<Result<(), anyhow::Error>>>,
    ) -> Result<(), anyhow::Error> {
        match spawned {
            Ok(handle) => {
                self.workers.push((name, handle));
                Ok(())
            }
            Err(err) => {
                self.shutdown.signal();
                let _ = self.join_all();
                Err(anyhow::Error::new(err).context(format!("Failed to spawn {} thread", name)))
            }
        }
    }

    pub fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    /// Block until shutdown, then join every worker
    ///
    /// Returns the first worker error; a panicked worker counts as an error.
    pub fn wait(mut self) -> Result<(), anyhow::Error> {
        self.shutdown.wait();
        self.store.freeze();
        debug!("Shutdown observed, joining workers");
        self.join_all()
    }

    fn join_all(&mut self) -> Result<(), anyhow::Error> {
        let mut first_error = None;
        for (name, handle) in self.workers.drain(..) {
            let result = match handle.join() {
                Ok(result) => result,
                Err(_) => Err(anyhow::anyhow!("{} thread panicked", name)),
            };
            match result {
                Ok(()) => debug!("{} thread joined", name),
                Err(err) => {
                    warn!("{} thread ended with error: {:#}", name, err);
                    first_error.get_or_insert(err);
                }
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
