//! AOF file handle
//!
//! Appends, syncs and closes the log under one exclusive lock.

use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::config::{AofSyncPolicy, Config};
use crate::error::{EmberError, Result};
use crate::protocol::{encode, RespReader, Value, DEFAULT_MAX_BULK_LEN, DEFAULT_MAX_DEPTH};

/// Byte sink behind the AOF
///
/// `File` is the production implementation; tests supply sinks that fail
/// part-way through a write.
pub trait AofStorage: Write + Send {
    /// Current length in bytes
    fn size(&self) -> io::Result<u64>;

    /// Cut the storage back to `len` bytes
    fn truncate(&mut self, len: u64) -> io::Result<()>;

    /// Force written bytes to stable storage
    fn sync(&self) -> io::Result<()>;
}

impl AofStorage for File {
    fn size(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }

    fn sync(&self) -> io::Result<()> {
        self.sync_data()
    }
}

/// The append-only file
///
/// ## Concurrency:
/// - `file`: every append, sync and close takes this lock
/// - Store locks are never held while this one is, and vice versa
/// - Counters are atomics so they can be read without the lock
///
/// An append either lands completely or not at all: a failed write (or a
/// failed fsync under `Always`) is cut back off the file. If that cut fails
/// too, the AOF refuses every later append.
pub struct Aof {
    /// Location on disk (replay reads from here)
    path: PathBuf,

    /// Open handle; `None` once closed
    file: Mutex<Option<Box<dyn AofStorage>>>,

    /// Set when a failed append could not be rolled back
    broken: AtomicBool,

    /// When appends reach stable storage
    sync_policy: AofSyncPolicy,

    /// Decoder limits used during replay
    max_depth: usize,
    max_bulk_len: usize,

    /// Requests appended since open
    appends: AtomicU64,

    /// Successful fsyncs since open
    syncs: AtomicU64,
}

impl Aof {
    /// Open or create the AOF at `path`
    pub fn open(path: impl AsRef<Path>, sync_policy: AofSyncPolicy) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)
            .map_err(|e| EmberError::persistence("open", e))?;

        Ok(Self::with_storage(path, Box::new(file), sync_policy))
    }

    /// Build an AOF over any storage; replay still reads from `path`
    pub fn with_storage(
        path: impl AsRef<Path>,
        storage: Box<dyn AofStorage>,
        sync_policy: AofSyncPolicy,
    ) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            file: Mutex::new(Some(storage)),
            broken: AtomicBool::new(false),
            sync_policy,
            max_depth: DEFAULT_MAX_DEPTH,
            max_bulk_len: DEFAULT_MAX_BULK_LEN,
            appends: AtomicU64::new(0),
            syncs: AtomicU64::new(0),
        }
    }

    /// Open the AOF described by `config`
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut aof = Self::open(config.aof_path(), config.sync_policy)?;
        aof.max_depth = config.max_nesting_depth;
        aof.max_bulk_len = config.max_bulk_len;
        Ok(aof)
    }

    /// Append raw encoded request bytes
    ///
    /// With `AofSyncPolicy::Always` the data is fsynced before returning.
    /// On error nothing of `bytes` is left in the file.
    pub fn append(&self, bytes: &[u8]) -> Result<()> {
        let mut guard = self.file.lock();
        let file = guard.as_mut().ok_or_else(|| closed_error("append"))?;

        if self.broken.load(Ordering::Acquire) {
            return Err(EmberError::persistence(
                "append",
                io::Error::new(
                    io::ErrorKind::Other,
                    "append-only file ends in a partial record; writes disabled",
                ),
            ));
        }

        let start = file
            .size()
            .map_err(|e| EmberError::persistence("append", e))?;

        let written = file
            .write_all(bytes)
            .and_then(|_| file.flush())
            .map_err(|e| EmberError::persistence("append", e))
            .and_then(|_| match self.sync_policy {
                AofSyncPolicy::Always => file
                    .sync()
                    .map_err(|e| EmberError::persistence("sync", e)),
                _ => Ok(()),
            });

        if let Err(e) = written {
            if let Err(undo) = file.truncate(start) {
                self.broken.store(true, Ordering::Release);
                tracing::error!(
                    "Could not roll back failed AOF append ({}); refusing further writes",
                    undo
                );
            }
            return Err(e);
        }

        if self.sync_policy == AofSyncPolicy::Always {
            self.syncs.fetch_add(1, Ordering::Relaxed);
        }
        self.appends.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Encode a request and append it
    pub fn append_value(&self, request: &Value) -> Result<()> {
        self.append(&encode(request))
    }

    /// Force appended data to stable storage
    ///
    /// A no-op once the file is closed.
    pub fn sync(&self) -> Result<()> {
        let guard = self.file.lock();
        if let Some(file) = guard.as_ref() {
            file.sync()
                .map_err(|e| EmberError::persistence("sync", e))?;
            self.syncs.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    /// Decode every request from the start of the file, in order
    ///
    /// Stops cleanly at end of file. A malformed or truncated request is a
    /// protocol error; an error returned by `apply` aborts the replay.
    /// Returns the number of requests replayed.
    pub fn replay<F>(&self, mut apply: F) -> Result<u64>
    where
        F: FnMut(Value) -> Result<()>,
    {
        if self.is_closed() {
            return Err(closed_error("replay"));
        }

        // Separate read handle so the append cursor is untouched. The file
        // lock is not held while `apply` runs; it may take store locks.
        let file = File::open(&self.path).map_err(|e| EmberError::persistence("replay", e))?;
        let mut reader = RespReader::new(BufReader::new(file))
            .with_max_depth(self.max_depth)
            .with_max_bulk_len(self.max_bulk_len);

        let mut replayed = 0;
        loop {
            let value = match reader.read_value() {
                Ok(Some(value)) => value,
                Ok(None) => break,
                Err(EmberError::Io(e)) => return Err(EmberError::persistence("replay", e)),
                Err(e) => return Err(e),
            };
            apply(value)?;
            replayed += 1;
        }

        Ok(replayed)
    }

    /// Sync and release the file handle. Calling it again does nothing.
    pub fn close(&self) -> Result<()> {
        let mut guard = self.file.lock();
        if let Some(file) = guard.take() {
            file.sync()
                .map_err(|e| EmberError::persistence("close", e))?;
            self.syncs.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn sync_policy(&self) -> AofSyncPolicy {
        self.sync_policy
    }

    pub fn is_closed(&self) -> bool {
        self.file.lock().is_none()
    }

    /// Whether a failed append could not be rolled back
    pub fn is_broken(&self) -> bool {
        self.broken.load(Ordering::Acquire)
    }

    /// Number of requests appended since open
    pub fn append_count(&self) -> u64 {
        self.appends.load(Ordering::Relaxed)
    }

    /// Number of successful fsyncs since open
    pub fn sync_count(&self) -> u64 {
        self.syncs.load(Ordering::Relaxed)
    }
}

fn closed_error(context: &'static str) -> EmberError {
    EmberError::persistence(
        context,
        io::Error::new(io::ErrorKind::Other, "append-only file is closed"),
    )
}
