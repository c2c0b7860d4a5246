//! Platform abstraction layer.
//!
//! All `#[cfg]` blocks for OS-specific signal delivery and liveness checks
//! live here. Spawning, killing and waiting go through `std::process`, which
//! is already portable.

pub mod process;

pub use process::{is_process_alive, send_signal, SignalKind};
