//! Error types for process handles.
//!
//! Every failed precondition maps to its own variant so callers can branch on
//! the cause instead of matching on message text.

use crate::process::StdStream;
use std::process::ExitStatus;
use thiserror::Error;

/// Main error type for process lifecycle operations.
#[derive(Debug, Error)]
pub enum ProcessError {
    // Construction errors
    #[error("Invalid command line {input:?}: {reason}")]
    InvalidCommandLine { input: String, reason: String },

    // State errors
    #[error("Process already running: {program}")]
    AlreadyRunning { program: String },

    #[error("Process not running: {program}")]
    NotRunning { program: String },

    #[error("Process handle for {program} has already been used; construct a new one")]
    Spent { program: String },

    #[error("No process has been spawned for {program}")]
    NoProcess { program: String },

    // Pipe errors
    #[error("Cannot attach {stream} pipe: process already running")]
    PipeRunning { stream: StdStream },

    #[error("The {stream} pipe has already been taken")]
    PipeTaken { stream: StdStream },

    #[error("Failed to create {stream} pipe")]
    PipeUnavailable {
        stream: StdStream,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read process {stream}")]
    StreamRead {
        stream: StdStream,
        #[source]
        source: std::io::Error,
    },

    // OS collaborator errors
    #[error("Failed to spawn {program}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to kill process {pid}")]
    KillFailed {
        pid: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to wait for process {pid}")]
    WaitFailed {
        pid: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to deliver {signal} to process {pid}")]
    SignalFailed {
        signal: &'static str,
        pid: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("{operation} is not supported on this platform")]
    Unsupported { operation: &'static str },

    // Outcome errors
    #[error("Process exited unsuccessfully: {0}")]
    Exited(ExitStatus),

    #[error("Process {pid} was stopped by another caller before it could be reaped")]
    Preempted { pid: u32 },
}

/// Result type alias for process operations.
pub type Result<T> = std::result::Result<T, ProcessError>;

impl ProcessError {
    /// Returns true if the error reports a call made in the wrong lifecycle state.
    pub fn is_state_error(&self) -> bool {
        matches!(
            self,
            ProcessError::AlreadyRunning { .. }
                | ProcessError::NotRunning { .. }
                | ProcessError::Spent { .. }
                | ProcessError::NoProcess { .. }
                | ProcessError::PipeRunning { .. }
                | ProcessError::PipeTaken { .. }
        )
    }

    /// Returns true if the process may be left unreaped and the handle should be discarded.
    pub fn leaves_zombie(&self) -> bool {
        matches!(
            self,
            ProcessError::KillFailed { .. } | ProcessError::WaitFailed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProcessError::AlreadyRunning {
            program: "ffmpeg".into(),
        };
        assert_eq!(err.to_string(), "Process already running: ffmpeg");

        let err = ProcessError::PipeRunning {
            stream: StdStream::Stderr,
        };
        assert_eq!(
            err.to_string(),
            "Cannot attach stderr pipe: process already running"
        );
    }

    #[test]
    fn test_state_errors() {
        assert!(ProcessError::NotRunning {
            program: "mpv".into()
        }
        .is_state_error());
        assert!(ProcessError::PipeTaken {
            stream: StdStream::Stdout
        }
        .is_state_error());
        assert!(!ProcessError::SpawnFailed {
            program: "mpv".into(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        }
        .is_state_error());
    }

    #[test]
    fn test_zombie_errors() {
        let kill = ProcessError::KillFailed {
            pid: 42,
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert!(kill.leaves_zombie());
        assert!(!ProcessError::Preempted { pid: 42 }.leaves_zombie());
    }

    #[test]
    fn test_source_is_preserved() {
        use std::error::Error as _;

        let err = ProcessError::WaitFailed {
            pid: 7,
            source: std::io::Error::new(std::io::ErrorKind::Other, "ECHILD"),
        };
        assert_eq!(err.source().map(|s| s.to_string()), Some("ECHILD".into()));
    }
}
