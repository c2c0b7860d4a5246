//! Cmdline Core - thread-safe control of one long-running external process.
//!
//! Built for media players and encoders that run indefinitely and are driven
//! from a UI thread and a monitoring thread at the same time. The crate parses
//! a whitespace-delimited command line, wires standard stream pipes, and runs
//! the process either interactively (`start`/`stop`), to completion (`run`),
//! or under an inactivity watchdog that kills it when its output stalls.
//!
//! # Example
//!
//! ```rust,no_run
//! use cmdline_core::{OutputStream, ProcessHandle};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! fn main() -> cmdline_core::Result<()> {
//!     let player = Arc::new(ProcessHandle::new("mpv --no-video http://radio/stream")?);
//!
//!     let monitor = Arc::clone(&player);
//!     let worker = std::thread::spawn(move || {
//!         monitor.run_with_inactivity_timeout(Duration::from_secs(5), b'\n', OutputStream::Stdout)
//!     });
//!
//!     // ... later, from the UI thread
//!     if player.is_running() {
//!         player.stop()?;
//!     }
//!     let _ = worker.join();
//!     Ok(())
//! }
//! ```

pub mod command_line;
pub mod config;
pub mod error;
pub mod platform;
pub mod process;

// Re-export commonly used types
pub use command_line::CommandLine;
pub use config::{HandleOptions, WatchdogConfig};
pub use error::{ProcessError, Result};
pub use platform::SignalKind;
pub use process::{OutputStream, ProcessHandle, ProcessStatus, StdStream, WatchReport};
