//! Configuration for EmberKV
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{EmberError, Result};

/// Main configuration for EmberKV instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for the append-only file
    /// Internal structure:
    ///   {data_dir}/
    ///     └── appendonly.aof
    pub data_dir: PathBuf,

    /// File name of the append-only file inside `data_dir`
    pub aof_filename: String,

    // -------------------------------------------------------------------------
    // AOF Configuration
    // -------------------------------------------------------------------------
    /// How often the append-only file is fsynced
    pub sync_policy: AofSyncPolicy,

    // -------------------------------------------------------------------------
    // Protocol Configuration
    // -------------------------------------------------------------------------
    /// Deepest Array nesting the decoder accepts
    pub max_nesting_depth: usize,

    /// Largest bulk string payload the decoder accepts (in bytes)
    pub max_bulk_len: usize,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Max concurrent client connections
    pub max_connections: usize,

    /// Connection read timeout (milliseconds, 0 disables)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds, 0 disables)
    pub write_timeout_ms: u64,
}

/// AOF sync policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AofSyncPolicy {
    /// fsync after every append (safest, slowest)
    Always,

    /// fsync from a background task once per interval (bounded loss window)
    EverySec { interval: Duration },

    /// never fsync explicitly; the OS decides when data reaches the disk
    No,
}

impl AofSyncPolicy {
    /// The default one-second periodic policy
    pub fn every_second() -> Self {
        AofSyncPolicy::EverySec {
            interval: Duration::from_secs(1),
        }
    }

    /// Parse the policy names used on the command line
    pub fn parse(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "always" => Ok(AofSyncPolicy::Always),
            "everysec" => Ok(AofSyncPolicy::every_second()),
            "no" => Ok(AofSyncPolicy::No),
            other => Err(EmberError::Config(format!(
                "unknown sync policy '{}' (expected always, everysec or no)",
                other
            ))),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./emberkv_data"),
            aof_filename: "appendonly.aof".to_string(),
            sync_policy: AofSyncPolicy::every_second(),
            max_nesting_depth: 32,
            max_bulk_len: 512 * 1024 * 1024, // 512 MB
            listen_addr: "127.0.0.1:6379".to_string(),
            max_connections: 1024,
            read_timeout_ms: 0,
            write_timeout_ms: 0,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Full path of the append-only file
    pub fn aof_path(&self) -> PathBuf {
        self.data_dir.join(&self.aof_filename)
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the append-only file name
    pub fn aof_filename(mut self, name: impl Into<String>) -> Self {
        self.config.aof_filename = name.into();
        self
    }

    /// Set the AOF sync policy
    pub fn sync_policy(mut self, policy: AofSyncPolicy) -> Self {
        self.config.sync_policy = policy;
        self
    }

    /// Set the maximum Array nesting depth accepted by the decoder
    pub fn max_nesting_depth(mut self, depth: usize) -> Self {
        self.config.max_nesting_depth = depth;
        self
    }

    /// Set the maximum bulk string length accepted by the decoder (in bytes)
    pub fn max_bulk_len(mut self, len: usize) -> Self {
        self.config.max_bulk_len = len;
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
