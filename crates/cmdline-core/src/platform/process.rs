//! Platform-specific signal delivery and liveness checks.

use crate::error::{ProcessError, Result};
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// Advisory signals that can be delivered to a child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    /// SIGINT (Ctrl-C). Lets the process flush and exit on its own.
    Interrupt,
    /// SIGTERM.
    Terminate,
}

impl SignalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::Interrupt => "SIGINT",
            SignalKind::Terminate => "SIGTERM",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deliver `signal` to the process `pid`.
///
/// # Platform Behavior
/// - **Linux/macOS**: `kill(pid, SIGINT | SIGTERM)` via `nix`
/// - **Other**: returns [`ProcessError::Unsupported`]
pub fn send_signal(pid: u32, signal: SignalKind) -> Result<()> {
    #[cfg(unix)]
    {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        let nix_signal = match signal {
            SignalKind::Interrupt => Signal::SIGINT,
            SignalKind::Terminate => Signal::SIGTERM,
        };

        debug!("Sending {} to process {}", signal, pid);
        kill(Pid::from_raw(pid as i32), nix_signal).map_err(|errno| {
            ProcessError::SignalFailed {
                signal: signal.as_str(),
                pid,
                source: std::io::Error::from(errno),
            }
        })
    }

    #[cfg(not(unix))]
    {
        debug!("Cannot send {} to process {} on this platform", signal, pid);
        Err(ProcessError::Unsupported {
            operation: signal.as_str(),
        })
    }
}

/// Check if a process with the given PID exists.
///
/// An exited but unreaped child still counts as alive.
///
/// # Platform Behavior
/// - **Linux/macOS**: `kill(pid, 0)` probe
/// - **Windows**: `OpenProcess` with `PROCESS_QUERY_LIMITED_INFORMATION`
pub fn is_process_alive(pid: u32) -> bool {
    #[cfg(unix)]
    {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        let Ok(raw) = i32::try_from(pid) else {
            return false;
        };
        match kill(Pid::from_raw(raw), None::<Signal>) {
            Ok(()) => true,
            // The process exists but belongs to someone else
            Err(nix::errno::Errno::EPERM) => true,
            Err(_) => false,
        }
    }

    #[cfg(windows)]
    {
        is_process_alive_windows(pid)
    }

    #[cfg(not(any(unix, windows)))]
    {
        tracing::warn!("Process alive check not implemented for this platform");
        let _ = pid;
        true
    }
}

#[cfg(windows)]
#[allow(unsafe_code)]
fn is_process_alive_windows(pid: u32) -> bool {
    use windows_sys::Win32::Foundation::CloseHandle;
    use windows_sys::Win32::System::Threading::{OpenProcess, PROCESS_QUERY_LIMITED_INFORMATION};

    // SAFETY: OpenProcess has no memory-safety preconditions and the returned
    // handle is closed before returning.
    unsafe {
        let handle = OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, 0, pid);
        if handle.is_null() {
            false
        } else {
            CloseHandle(handle);
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_process_alive_self() {
        assert!(is_process_alive(std::process::id()));
    }

    #[test]
    fn test_is_process_alive_nonexistent() {
        assert!(!is_process_alive(4_000_000_000));
    }

    #[test]
    fn test_signal_names() {
        assert_eq!(SignalKind::Interrupt.to_string(), "SIGINT");
        assert_eq!(SignalKind::Terminate.as_str(), "SIGTERM");
    }

    #[cfg(unix)]
    #[test]
    fn test_send_signal_to_missing_process() {
        // pid_max on Linux is far below this
        let err = send_signal(3_999_999, SignalKind::Interrupt).unwrap_err();
        assert!(matches!(
            err,
            ProcessError::SignalFailed {
                signal: "SIGINT",
                pid: 3_999_999,
                ..
            }
        ));
    }
}
