//! Standard stream pipes attached before spawn.

use crate::error::{ProcessError, Result};
use serde::Serialize;
use std::fmt;
use std::io::{PipeReader, PipeWriter};
use std::process::Stdio;

/// One of the three standard streams of a child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StdStream {
    Stdin,
    Stdout,
    Stderr,
}

impl StdStream {
    pub fn as_str(&self) -> &'static str {
        match self {
            StdStream::Stdin => "stdin",
            StdStream::Stdout => "stdout",
            StdStream::Stderr => "stderr",
        }
    }
}

impl fmt::Display for StdStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An output stream that the inactivity watchdog can observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputStream {
    Stdout,
    Stderr,
}

impl From<OutputStream> for StdStream {
    fn from(stream: OutputStream) -> Self {
        match stream {
            OutputStream::Stdout => StdStream::Stdout,
            OutputStream::Stderr => StdStream::Stderr,
        }
    }
}

impl fmt::Display for OutputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        StdStream::from(*self).fmt(f)
    }
}

/// Child-side ends of pipes handed out before spawn.
///
/// Duplicates of the ends go into the `Command` at spawn time. Once the child
/// is running both the `Command` and the originals are dropped, so the
/// parent holds no copy of a child's write end and readers see EOF once the
/// child exits. A failed spawn keeps the originals attached.
#[derive(Debug, Default)]
pub(crate) struct PendingStdio {
    stdin: Option<PipeReader>,
    stdout: Option<PipeWriter>,
    stderr: Option<PipeWriter>,
}

impl PendingStdio {
    pub(crate) fn is_attached(&self, stream: StdStream) -> bool {
        match stream {
            StdStream::Stdin => self.stdin.is_some(),
            StdStream::Stdout => self.stdout.is_some(),
            StdStream::Stderr => self.stderr.is_some(),
        }
    }

    /// Create a pipe for the child's stdin and return the parent's write end.
    pub(crate) fn attach_stdin(&mut self) -> Result<PipeWriter> {
        self.ensure_free(StdStream::Stdin)?;
        let (reader, writer) = open_pipe(StdStream::Stdin)?;
        self.stdin = Some(reader);
        Ok(writer)
    }

    /// Create a pipe for a child output stream and return the parent's read end.
    pub(crate) fn attach_output(&mut self, stream: OutputStream) -> Result<PipeReader> {
        let std_stream = StdStream::from(stream);
        self.ensure_free(std_stream)?;
        let (reader, writer) = open_pipe(std_stream)?;
        match stream {
            OutputStream::Stdout => self.stdout = Some(writer),
            OutputStream::Stderr => self.stderr = Some(writer),
        }
        Ok(reader)
    }

    /// Duplicate the child ends for a spawn attempt, falling back to inherit
    /// or null for unattached streams.
    ///
    /// The originals stay attached so a failed spawn leaves the caller's
    /// pipes usable. Call [`release`](Self::release) once the child is running.
    pub(crate) fn stdio(&self, null_stdio: bool) -> Result<[Stdio; 3]> {
        let fallback = || if null_stdio { Stdio::null() } else { Stdio::inherit() };
        let stdin = match &self.stdin {
            Some(reader) => Stdio::from(duplicate(reader.try_clone(), StdStream::Stdin)?),
            None => fallback(),
        };
        let stdout = match &self.stdout {
            Some(writer) => Stdio::from(duplicate(writer.try_clone(), StdStream::Stdout)?),
            None => fallback(),
        };
        let stderr = match &self.stderr {
            Some(writer) => Stdio::from(duplicate(writer.try_clone(), StdStream::Stderr)?),
            None => fallback(),
        };
        Ok([stdin, stdout, stderr])
    }

    /// Drop the parent's copy of one child end.
    pub(crate) fn detach(&mut self, stream: StdStream) {
        match stream {
            StdStream::Stdin => self.stdin = None,
            StdStream::Stdout => self.stdout = None,
            StdStream::Stderr => self.stderr = None,
        }
    }

    /// Drop the parent's copies of all child ends.
    pub(crate) fn release(&mut self) {
        for stream in [StdStream::Stdin, StdStream::Stdout, StdStream::Stderr] {
            self.detach(stream);
        }
    }

    fn ensure_free(&self, stream: StdStream) -> Result<()> {
        if self.is_attached(stream) {
            return Err(ProcessError::PipeTaken { stream });
        }
        Ok(())
    }
}

fn open_pipe(stream: StdStream) -> Result<(PipeReader, PipeWriter)> {
    std::io::pipe().map_err(|source| ProcessError::PipeUnavailable { stream, source })
}

fn duplicate<T>(end: std::io::Result<T>, stream: StdStream) -> Result<T> {
    end.map_err(|source| ProcessError::PipeUnavailable { stream, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};

    #[test]
    fn test_stream_names() {
        assert_eq!(StdStream::Stdin.to_string(), "stdin");
        assert_eq!(OutputStream::Stderr.to_string(), "stderr");
        assert_eq!(StdStream::from(OutputStream::Stdout), StdStream::Stdout);
    }

    #[test]
    fn test_attach_twice_is_rejected() {
        let mut pending = PendingStdio::default();
        pending.attach_output(OutputStream::Stdout).unwrap();

        let err = pending.attach_output(OutputStream::Stdout).unwrap_err();
        assert!(matches!(
            err,
            ProcessError::PipeTaken {
                stream: StdStream::Stdout
            }
        ));
        // Other streams are independent
        assert!(pending.attach_output(OutputStream::Stderr).is_ok());
        assert!(pending.attach_stdin().is_ok());
    }

    #[test]
    fn test_stdio_keeps_attachments_until_release() {
        let mut pending = PendingStdio::default();
        pending.attach_stdin().unwrap();
        pending.attach_output(OutputStream::Stderr).unwrap();

        drop(pending.stdio(true).unwrap());
        assert!(pending.is_attached(StdStream::Stdin));
        assert!(pending.is_attached(StdStream::Stderr));

        pending.release();
        assert!(!pending.is_attached(StdStream::Stdin));
        assert!(!pending.is_attached(StdStream::Stderr));
    }

    #[test]
    fn test_reader_sees_eof_only_after_release() {
        let mut pending = PendingStdio::default();
        let mut reader = pending.attach_output(OutputStream::Stdout).unwrap();

        // A spawn attempt that never happened
        drop(pending.stdio(false).unwrap());
        let mut child_end = pending.stdout.as_ref().unwrap();
        child_end.write_all(b"still open\n").unwrap();

        pending.release();
        let mut out = String::new();
        reader.read_to_string(&mut out).unwrap();
        assert_eq!(out, "still open\n");
    }

    #[test]
    fn test_dropping_child_end_gives_eof() {
        let (mut reader, mut writer) = open_pipe(StdStream::Stdout).unwrap();
        writer.write_all(b"frame=1\n").unwrap();
        drop(writer);

        let mut out = String::new();
        reader.read_to_string(&mut out).unwrap();
        assert_eq!(out, "frame=1\n");
    }
}
