//! Engine Module
//!
//! Ties the store, the command registry and the AOF together.
//!
//! ## Responsibilities
//! - Validate request shape and resolve the command
//! - Append accepted writes to the AOF, then apply them
//! - Rebuild the store from the AOF on startup
//! - Own the periodic sync task

use std::fs;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;

use crate::aof::{Aof, SyncTask};
use crate::command::{CommandHandler, Registry, Resolved};
use crate::config::{AofSyncPolicy, Config};
use crate::error::{EmberError, Result};
use crate::protocol::Value;
use crate::store::Store;

/// The main engine
///
/// ## Concurrency Model
///
/// - **Store**: each partition has its own `RwLock`; handlers take exactly
///   one of them for the duration of the read or mutation
/// - **AOF**: its own `Mutex`, taken only for append/sync/close
/// - No path holds a store lock and the AOF lock at the same time
///
/// ## Write path
///
/// resolve → arity check → AOF append → store mutation → reply
///
/// Appending first means a failed append leaves the store untouched: the
/// write is refused and the caller gets `EmberError::Persistence`.
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// In-memory state
    store: Store,

    /// Command name → handler
    registry: Registry,

    /// Append-only file (shared with the sync task)
    aof: Arc<Aof>,

    /// Background fsync, present with `AofSyncPolicy::EverySec`
    sync_task: Mutex<Option<SyncTask>>,
}

impl Engine {
    /// Open an engine with the built-in commands
    ///
    /// On startup:
    /// 1. Create the data directory
    /// 2. Open/create the AOF
    /// 3. Replay the AOF into an empty store
    /// 4. Start the sync task (if the policy asks for one)
    pub fn open(config: Config) -> Result<Self> {
        Self::open_with_registry(config, Registry::with_default_commands())
    }

    /// Open an engine with a caller-supplied registry
    pub fn open_with_registry(config: Config, registry: Registry) -> Result<Self> {
        // Step 1: Data directory
        fs::create_dir_all(&config.data_dir)
            .map_err(|e| EmberError::persistence("create data directory", e))?;

        // Step 2: AOF
        let aof = Arc::new(Aof::from_config(&config)?);

        let engine = Self {
            config,
            store: Store::new(),
            registry,
            aof,
            sync_task: Mutex::new(None),
        };

        // Step 3: Replay; any failure here aborts startup
        engine.replay()?;

        // Step 4: Periodic sync
        if let AofSyncPolicy::EverySec { interval } = engine.config.sync_policy {
            let task = SyncTask::spawn(Arc::clone(&engine.aof), interval)?;
            *engine.sync_task.lock() = Some(task);
        }

        Ok(engine)
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(Config::builder().data_dir(path).build())
    }

    /// Execute a live request
    ///
    /// Protocol-level problems (not an array, unknown command, wrong arity)
    /// come back as `Ok(Value::Error(..))`. `Err` means the AOF append for a
    /// write failed and the write was not applied.
    pub fn execute(&self, request: &Value) -> Result<Value> {
        self.route(request, true)
    }

    /// Re-run every request in the AOF through the live dispatch path
    fn replay(&self) -> Result<u64> {
        let mut rejected = 0u64;
        let replayed = self.aof.replay(|request| {
            let reply = self.route(&request, false)?;
            if let Value::Error(message) = reply {
                rejected += 1;
                tracing::warn!("Replayed request rejected: {}", message);
            }
            Ok(())
        })?;

        if replayed > 0 {
            tracing::info!(
                "AOF replay: {} requests from {}, {} rejected",
                replayed,
                self.aof.path().display(),
                rejected
            );
        }
        Ok(replayed)
    }

    /// Shared by live traffic (`log = true`) and replay (`log = false`)
    fn route(&self, request: &Value, log: bool) -> Result<Value> {
        let (name, args) = match split_request(request) {
            Some(parts) => parts,
            None => return Ok(Value::error("ERR invalid request, expected array")),
        };

        let handler = match self.registry.resolve(&name, args.len()) {
            Resolved::Ready(handler) => handler,
            Resolved::WrongArity(reply) => return Ok(reply),
            Resolved::Unknown => {
                return Ok(Value::error(format!(
                    "ERR unknown command '{}'",
                    String::from_utf8_lossy(&name)
                )))
            }
        };

        if log && handler.is_write() {
            self.aof.append_value(request)?;
        }

        tracing::trace!("{} with {} args", handler.name(), args.len());
        Ok(handler.call(&self.store, &args))
    }

    /// Stop the sync task, sync and close the AOF
    ///
    /// Safe to call more than once. Writes after close fail.
    pub fn close(&self) -> Result<()> {
        if let Some(task) = self.sync_task.lock().take() {
            task.stop();
        }
        self.aof.close()
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn aof(&self) -> &Aof {
        &self.aof
    }

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}

/// Split a request into command name and arguments
///
/// `None` unless the request is a non-empty Array of bulk strings.
fn split_request(request: &Value) -> Option<(Bytes, Vec<Bytes>)> {
    let items = request.as_array()?;
    let (name, rest) = items.split_first()?;
    let args = rest
        .iter()
        .map(|item| item.as_bulk().cloned())
        .collect::<Option<Vec<_>>>()?;
    Some((name.as_bulk()?.clone(), args))
}
