//! Process lifecycle management.
//!
//! A [`ProcessHandle`] wraps one external process behind a single lock:
//! - `start`/`stop` for processes controlled interactively
//! - `run` for blocking run-to-completion
//! - `run_with_inactivity_timeout` for runs guarded by a watchdog that kills
//!   the process when a watched output stream goes quiet
//!
//! # Example
//!
//! ```rust,no_run
//! use cmdline_core::process::ProcessHandle;
//! use std::io::Read;
//!
//! fn main() -> anyhow::Result<()> {
//!     let handle = ProcessHandle::new("echo hello")?;
//!     let mut stdout = handle.stdout_pipe()?;
//!     handle.run()?;
//!
//!     let mut output = String::new();
//!     stdout.read_to_string(&mut output)?;
//!     assert_eq!(output, "hello\n");
//!     Ok(())
//! }
//! ```

mod handle;
mod pipes;
mod state;
mod watchdog;

pub use handle::ProcessHandle;
pub use pipes::{OutputStream, StdStream};
pub use state::ProcessStatus;
pub use watchdog::WatchReport;
pub use std::io::{PipeReader, PipeWriter};
