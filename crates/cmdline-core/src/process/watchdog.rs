//! Inactivity watchdog for timed runs.
//!
//! The reader side stamps an [`ActivityClock`] each time a chunk arrives on
//! the watched stream. A [`Watchdog`] wakes on a coarse interval and asks its
//! target to kill the process once the clock has been idle for longer than the
//! timeout. The clock stays unarmed until the first chunk, so slow-starting
//! processes are never killed before they produce output.

use std::process::ExitStatus;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Outcome of a watchdog-guarded run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchReport {
    /// Exit status, or `None` when another caller reaped the process first.
    pub status: Option<ExitStatus>,
    /// Number of delimited chunks read from the watched stream.
    pub chunks: u64,
    /// Whether the watchdog killed the process for inactivity.
    pub killed_by_watchdog: bool,
}

impl WatchReport {
    /// True if the process exited successfully without being killed.
    pub fn exited_cleanly(&self) -> bool {
        !self.killed_by_watchdog && self.status.is_some_and(|status| status.success())
    }
}

/// Timestamp of the last observed output.
#[derive(Debug, Default)]
pub(crate) struct ActivityClock {
    last: Mutex<Option<Instant>>,
}

impl ActivityClock {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Record activity now. The first call arms the clock.
    pub(crate) fn touch(&self) {
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        *last = Some(Instant::now());
    }

    /// Time since the last activity, or `None` before any activity was seen.
    pub(crate) fn idle_for(&self) -> Option<Duration> {
        let last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        last.map(|at| at.elapsed())
    }
}

/// The process a watchdog supervises.
pub(crate) trait Supervised {
    /// Whether the supervised run is still active.
    fn is_running(&self) -> bool;

    /// Forcibly kill the process. Returns true if the kill was delivered.
    fn kill_for_inactivity(&self, idle: Duration) -> bool;
}

/// Polling watchdog for a single timed run.
pub(crate) struct Watchdog<'a> {
    clock: &'a ActivityClock,
    timeout: Duration,
    interval: Duration,
}

impl<'a> Watchdog<'a> {
    pub(crate) fn new(clock: &'a ActivityClock, timeout: Duration, interval: Duration) -> Self {
        Self {
            clock,
            timeout,
            interval,
        }
    }

    /// Supervise `target` until `done` fires or disconnects, or the target stops running.
    ///
    /// Kills at most once. Returns true if the watchdog killed the process.
    pub(crate) fn run<S: Supervised + ?Sized>(&self, target: &S, done: Receiver<()>) -> bool {
        let mut fired = false;

        loop {
            match done.recv_timeout(self.interval) {
                Err(RecvTimeoutError::Timeout) => {}
                Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                    debug!("Watchdog released by reader");
                    break;
                }
            }

            if !target.is_running() {
                debug!("Watchdog exiting: process no longer running");
                break;
            }

            if fired {
                continue;
            }

            if let Some(idle) = self.clock.idle_for() {
                if idle > self.timeout {
                    warn!(
                        "No output for {:?} (timeout {:?}), killing process",
                        idle, self.timeout
                    );
                    fired = target.kill_for_inactivity(idle);
                }
            }
        }

        fired
    }
}
