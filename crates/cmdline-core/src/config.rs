//! Centralized configuration for process handles.
//!
//! Timing constants live on unit structs; per-handle settings are carried by
//! [`HandleOptions`] and applied when the process is spawned.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Inactivity watchdog timing.
pub struct WatchdogConfig;

impl WatchdogConfig {
    /// How often the watchdog compares the idle time against the timeout.
    pub const POLL_INTERVAL: Duration = Duration::from_secs(1);
    /// How often a run-to-completion call checks whether its child has exited.
    pub const REAP_INTERVAL: Duration = Duration::from_millis(50);
    /// Default chunk delimiter for watched streams.
    pub const DEFAULT_DELIMITER: u8 = b'\n';
}

/// Per-handle spawn and timing options.
#[derive(Debug, Clone)]
pub struct HandleOptions {
    /// Environment variables added to the child's environment.
    pub env_vars: HashMap<String, String>,
    /// Working directory for the child (inherited when `None`).
    pub current_dir: Option<PathBuf>,
    /// Watchdog wake-up period.
    pub watchdog_interval: Duration,
    /// Poll period used while waiting for a child to exit.
    pub reap_interval: Duration,
    /// Connect streams without a pipe to the null device instead of inheriting them.
    pub null_stdio: bool,
}

impl Default for HandleOptions {
    fn default() -> Self {
        Self {
            env_vars: HashMap::new(),
            current_dir: None,
            watchdog_interval: WatchdogConfig::POLL_INTERVAL,
            reap_interval: WatchdogConfig::REAP_INTERVAL,
            null_stdio: false,
        }
    }
}

impl HandleOptions {
    /// Create options with the default timings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an environment variable.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.insert(key.into(), value.into());
        self
    }

    /// Set the working directory.
    pub fn with_current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Set the watchdog wake-up period.
    pub fn with_watchdog_interval(mut self, interval: Duration) -> Self {
        self.watchdog_interval = interval;
        self
    }

    /// Set the reap poll period.
    pub fn with_reap_interval(mut self, interval: Duration) -> Self {
        self.reap_interval = interval;
        self
    }

    /// Discard output of streams that have no pipe attached.
    pub fn with_null_stdio(mut self, null_stdio: bool) -> Self {
        self.null_stdio = null_stdio;
        self
    }
}
