//! Lifecycle status of a process handle.

use serde::Serialize;
use std::fmt;
use std::process::ExitStatus;

/// Where a [`ProcessHandle`](super::ProcessHandle) is in its lifecycle.
///
/// ```text
/// Idle ──start/run──▶ Running ──exit reaped──▶ Exited
///                       │  │
///                       │  └──send_interrupt──▶ Interrupted ──try_reap/run──▶ Exited
///                       └──stop──▶ Stopped
///                             └──kill/wait failed──▶ Zombie ──stop──▶ Stopped
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ProcessStatus {
    /// Constructed, not spawned yet. Pipes may still be attached.
    Idle,
    /// Spawned and not yet reaped.
    Running { pid: u32 },
    /// An interrupt was delivered; the child has not been reaped yet.
    Interrupted { pid: u32 },
    /// The child exited and was reaped. `code` is `None` when it died from a signal.
    Exited { code: Option<i32> },
    /// Killed and reaped by `stop()`.
    Stopped,
    /// A kill or wait failed; the child may still occupy a process-table slot.
    Zombie { pid: u32 },
}

impl ProcessStatus {
    /// Whether the handle considers its process active.
    ///
    /// Zombies count as running: the OS still holds an entry for them and
    /// `stop()` may be retried.
    pub fn is_running(&self) -> bool {
        matches!(
            self,
            ProcessStatus::Running { .. } | ProcessStatus::Zombie { .. }
        )
    }

    /// Whether the process has been reaped and the handle cannot spawn again.
    pub fn is_spent(&self) -> bool {
        matches!(self, ProcessStatus::Exited { .. } | ProcessStatus::Stopped)
    }

    /// The OS process id, while one is held.
    pub fn pid(&self) -> Option<u32> {
        match self {
            ProcessStatus::Running { pid }
            | ProcessStatus::Interrupted { pid }
            | ProcessStatus::Zombie { pid } => Some(*pid),
            _ => None,
        }
    }

    pub(crate) fn exited(status: ExitStatus) -> Self {
        ProcessStatus::Exited {
            code: status.code(),
        }
    }
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessStatus::Idle => write!(f, "idle"),
            ProcessStatus::Running { pid } => write!(f, "running (pid {})", pid),
            ProcessStatus::Interrupted { pid } => write!(f, "interrupted (pid {})", pid),
            ProcessStatus::Exited { code: Some(code) } => write!(f, "exited with code {}", code),
            ProcessStatus::Exited { code: None } => write!(f, "exited by signal"),
            ProcessStatus::Stopped => write!(f, "stopped"),
            ProcessStatus::Zombie { pid } => write!(f, "zombie (pid {})", pid),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_states() {
        assert!(!ProcessStatus::Idle.is_running());
        assert!(ProcessStatus::Running { pid: 10 }.is_running());
        assert!(!ProcessStatus::Interrupted { pid: 10 }.is_running());
        assert!(!ProcessStatus::Exited { code: Some(0) }.is_running());
        assert!(!ProcessStatus::Stopped.is_running());
        assert!(ProcessStatus::Zombie { pid: 10 }.is_running());
    }

    #[test]
    fn test_spent_states() {
        assert!(ProcessStatus::Stopped.is_spent());
        assert!(ProcessStatus::Exited { code: None }.is_spent());
        assert!(!ProcessStatus::Idle.is_spent());
        assert!(!ProcessStatus::Zombie { pid: 3 }.is_spent());
    }

    #[test]
    fn test_pid() {
        assert_eq!(ProcessStatus::Running { pid: 77 }.pid(), Some(77));
        assert_eq!(ProcessStatus::Interrupted { pid: 78 }.pid(), Some(78));
        assert_eq!(ProcessStatus::Stopped.pid(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(ProcessStatus::Running { pid: 5 }.to_string(), "running (pid 5)");
        assert_eq!(
            ProcessStatus::Exited { code: Some(1) }.to_string(),
            "exited with code 1"
        );
    }

    #[test]
    fn test_serialize_tagged() {
        let json = serde_json::to_value(ProcessStatus::Running { pid: 12 }).unwrap();
        assert_eq!(json, serde_json::json!({ "state": "running", "pid": 12 }));

        let json = serde_json::to_value(ProcessStatus::Idle).unwrap();
        assert_eq!(json, serde_json::json!({ "state": "idle" }));
    }
}
