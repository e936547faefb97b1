//! Periodic AOF sync
//!
//! A background thread fsyncs the AOF once per interval until stopped.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Sender};

use crate::error::Result;
use super::Aof;

/// Handle to the running sync thread
///
/// Stopping (or dropping) the handle wakes the thread immediately and joins
/// it; it never outlives the owner.
pub struct SyncTask {
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
    interval: Duration,
}

impl SyncTask {
    /// Start syncing `aof` every `interval`
    pub fn spawn(aof: Arc<Aof>, interval: Duration) -> Result<Self> {
        let (stop_tx, stop_rx) = channel::bounded::<()>(0);
        let ticker = channel::tick(interval);

        let handle = thread::Builder::new()
            .name("aof-sync".to_string())
            .spawn(move || {
                tracing::debug!("AOF sync task started (interval {:?})", interval);
                loop {
                    channel::select! {
                        // A message or a dropped sender both mean stop.
                        recv(stop_rx) -> _ => break,
                        recv(ticker) -> _ => {
                            if let Err(e) = aof.sync() {
                                tracing::error!("Periodic AOF sync failed: {}", e);
                            }
                        }
                    }
                }
                tracing::debug!("AOF sync task stopped");
            })?;

        Ok(Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
            interval,
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Stop the task and wait for the thread to exit
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        drop(self.stop_tx.take());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("AOF sync thread panicked");
            }
        }
    }
}

impl Drop for SyncTask {
    fn drop(&mut self) {
        self.shutdown();
    }
}
