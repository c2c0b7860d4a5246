//! Thread-safe lifecycle wrapper around one external process.

use super::pipes::{OutputStream, PendingStdio, StdStream};
use super::state::ProcessStatus;
use super::watchdog::{ActivityClock, Supervised, WatchReport, Watchdog};
use crate::command_line::CommandLine;
use crate::config::HandleOptions;
use crate::error::{ProcessError, Result};
use crate::platform::{self, SignalKind};
use std::io::{BufRead, BufReader, PipeReader, PipeWriter};
use std::process::{Child, Command, ExitStatus};
use std::sync::{mpsc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// State guarded by the handle's lock.
#[derive(Debug)]
struct Inner {
    status: ProcessStatus,
    /// Present from spawn until the child is reaped.
    child: Option<Child>,
    /// Pipes attached before spawn.
    stdio: PendingStdio,
}

/// A long-running external process that can be driven from several threads.
///
/// Every state transition and every access to the underlying [`Child`] is
/// serialized through one lock. Blocking reads and waits happen outside it,
/// so a UI thread can call [`stop`](Self::stop) or
/// [`is_running`](Self::is_running) while another thread sits in
/// [`run`](Self::run).
///
/// Handles are one-shot: once the process has been reaped the handle refuses
/// to spawn again and a new one must be constructed.
///
/// # Example
///
/// ```rust,no_run
/// use cmdline_core::{OutputStream, ProcessHandle};
/// use std::time::Duration;
///
/// # fn main() -> cmdline_core::Result<()> {
/// let encoder = ProcessHandle::new("ffmpeg -i input.ts -f mpegts udp://239.0.0.1:1234")?;
/// let report =
///     encoder.run_with_inactivity_timeout(Duration::from_secs(10), b'\r', OutputStream::Stderr)?;
/// if report.killed_by_watchdog {
///     eprintln!("encoder stalled");
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ProcessHandle {
    command_line: CommandLine,
    options: HandleOptions,
    inner: Mutex<Inner>,
    status_tx: watch::Sender<ProcessStatus>,
}

impl ProcessHandle {
    /// Parse `command_line` and create an idle handle with default options.
    ///
    /// The program is not resolved or checked until it is spawned.
    pub fn new(command_line: impl Into<String>) -> Result<Self> {
        Self::with_options(command_line, HandleOptions::default())
    }

    /// Parse `command_line` and create an idle handle.
    pub fn with_options(command_line: impl Into<String>, options: HandleOptions) -> Result<Self> {
        let command_line = CommandLine::parse(command_line)?;
        let (status_tx, _) = watch::channel(ProcessStatus::Idle);

        Ok(Self {
            command_line,
            options,
            inner: Mutex::new(Inner {
                status: ProcessStatus::Idle,
                child: None,
                stdio: PendingStdio::default(),
            }),
            status_tx,
        })
    }

    /// The parsed command line.
    pub fn command_line(&self) -> &CommandLine {
        &self.command_line
    }

    /// Current lifecycle status.
    pub fn status(&self) -> ProcessStatus {
        self.lock().status
    }

    /// Whether the handle considers its process active.
    pub fn is_running(&self) -> bool {
        self.lock().status.is_running()
    }

    /// OS process id, while the child is held by this handle.
    pub fn pid(&self) -> Option<u32> {
        self.lock().child.as_ref().map(Child::id)
    }

    /// Observe status transitions.
    ///
    /// The receiver starts at the current status and is updated on every
    /// transition, including the child being reaped.
    pub fn subscribe(&self) -> watch::Receiver<ProcessStatus> {
        self.status_tx.subscribe()
    }

    /// Spawn the process without waiting for it.
    ///
    /// The caller must eventually call [`stop`](Self::stop), or
    /// [`try_reap`](Self::try_reap) once the process has exited by itself;
    /// otherwise the exited child stays in the OS process table as a zombie.
    pub fn start(&self) -> Result<()> {
        let mut inner = self.lock();
        self.ensure_startable(&inner)?;
        self.spawn_locked(&mut inner)?;
        Ok(())
    }

    /// Kill the process and reap it.
    ///
    /// Returns the reaped exit status. If the kill or the wait fails the
    /// handle moves to [`ProcessStatus::Zombie`]; `stop` may be retried, but
    /// the handle should usually be discarded.
    pub fn stop(&self) -> Result<ExitStatus> {
        let mut inner = self.lock();
        if !inner.status.is_running() {
            return Err(self.not_running());
        }
        let Some(mut child) = inner.child.take() else {
            return Err(self.not_running());
        };
        let pid = child.id();

        info!("Stopping process {} ({})", pid, self.command_line.program());

        if let Err(source) = child.kill() {
            error!("Failed to kill process {}: {}", pid, source);
            inner.child = Some(child);
            self.transition(&mut inner, ProcessStatus::Zombie { pid });
            return Err(ProcessError::KillFailed { pid, source });
        }

        // SIGKILL cannot be ignored, so this wait is short
        match child.wait() {
            Ok(status) => {
                debug!("Reaped stopped process {}: {}", pid, status);
                self.transition(&mut inner, ProcessStatus::Stopped);
                Ok(status)
            }
            Err(source) => {
                error!("Failed to reap process {}: {}", pid, source);
                inner.child = Some(child);
                self.transition(&mut inner, ProcessStatus::Zombie { pid });
                Err(ProcessError::WaitFailed { pid, source })
            }
        }
    }

    /// Spawn the process and block until it exits.
    ///
    /// Returns `Ok(())` on a successful exit status and
    /// [`ProcessError::Exited`] otherwise. If another caller stops the
    /// process first, returns [`ProcessError::Preempted`].
    pub fn run(&self) -> Result<()> {
        let pid = {
            let mut inner = self.lock();
            self.ensure_startable(&inner)?;
            self.spawn_locked(&mut inner)?
        };

        match self.reap_blocking()? {
            Some(status) if status.success() => Ok(()),
            Some(status) => Err(ProcessError::Exited(status)),
            None => Err(ProcessError::Preempted { pid }),
        }
    }

    /// Spawn the process, read `stream` chunk by chunk and kill the process
    /// if no chunk arrives for longer than `timeout`.
    ///
    /// A chunk ends at `delimiter` (`b'\n'` for line output, `b'\r'` for
    /// progress meters that redraw one line). The watchdog only arms after the
    /// first chunk, so a process that never writes is left alone until it
    /// exits. Detection latency is up to one watchdog interval.
    ///
    /// Blocks until the stream closes and the process is reaped.
    pub fn run_with_inactivity_timeout(
        &self,
        timeout: Duration,
        delimiter: u8,
        stream: OutputStream,
    ) -> Result<WatchReport> {
        self.run_with_inactivity_timeout_observed(timeout, delimiter, stream, |_| {})
    }

    /// Like [`run_with_inactivity_timeout`](Self::run_with_inactivity_timeout),
    /// passing every chunk (delimiter included) to `on_chunk`.
    pub fn run_with_inactivity_timeout_observed<F>(
        &self,
        timeout: Duration,
        delimiter: u8,
        stream: OutputStream,
        mut on_chunk: F,
    ) -> Result<WatchReport>
    where
        F: FnMut(&[u8]),
    {
        let reader = {
            let mut inner = self.lock();
            self.ensure_startable(&inner)?;
            let reader = inner.stdio.attach_output(stream)?;
            if let Err(e) = self.spawn_locked(&mut inner) {
                inner.stdio.detach(stream.into());
                return Err(e);
            }
            reader
        };

        let clock = ActivityClock::new();
        let watchdog = Watchdog::new(&clock, timeout, self.options.watchdog_interval);
        let (done_tx, done_rx) = mpsc::channel::<()>();

        let (read_result, reap_result, killed_by_watchdog) = thread::scope(|s| {
            let guard = s.spawn(|| watchdog.run(self, done_rx));

            let read_result = read_chunks(reader, delimiter, stream, &clock, &mut on_chunk);
            // The watchdog keeps watching until the child is reaped
            let reap_result = self.reap_blocking();
            drop(done_tx);

            let killed = guard.join().unwrap_or_else(|_| {
                warn!("Watchdog thread panicked");
                false
            });
            (read_result, reap_result, killed)
        });

        let chunks = read_result?;
        let status = reap_result?;

        Ok(WatchReport {
            status,
            chunks,
            killed_by_watchdog,
        })
    }

    /// Ask the process to terminate with SIGINT.
    ///
    /// The handle stops considering the process running whatever the outcome,
    /// and does not wait for it to exit. A run in progress still reaps it;
    /// after [`start`](Self::start), use [`try_reap`](Self::try_reap).
    pub fn send_interrupt(&self) -> Result<()> {
        let mut inner = self.lock();
        let Some(pid) = inner.child.as_ref().map(Child::id) else {
            return Err(ProcessError::NoProcess {
                program: self.command_line.program().to_string(),
            });
        };

        if inner.status.is_running() {
            self.transition(&mut inner, ProcessStatus::Interrupted { pid });
        }

        info!("Interrupting process {} ({})", pid, self.command_line.program());
        platform::send_signal(pid, SignalKind::Interrupt)
    }

    /// Reap the process if it has exited, without blocking.
    ///
    /// Returns `Ok(None)` while the process is still alive or when there is
    /// nothing to reap.
    pub fn try_reap(&self) -> Result<Option<ExitStatus>> {
        let mut inner = self.lock();
        self.try_reap_locked(&mut inner)
    }

    /// Attach a pipe to the child's stdout. Must be called before spawning.
    pub fn stdout_pipe(&self) -> Result<PipeReader> {
        self.output_pipe(OutputStream::Stdout)
    }

    /// Attach a pipe to the child's stderr. Must be called before spawning.
    pub fn stderr_pipe(&self) -> Result<PipeReader> {
        self.output_pipe(OutputStream::Stderr)
    }

    /// Attach a pipe to the child's stdin. Must be called before spawning.
    ///
    /// Drop the writer to signal EOF to the child.
    pub fn stdin_pipe(&self) -> Result<PipeWriter> {
        let mut inner = self.lock();
        self.ensure_attachable(&inner, StdStream::Stdin)?;
        inner.stdio.attach_stdin()
    }

    fn output_pipe(&self, stream: OutputStream) -> Result<PipeReader> {
        let mut inner = self.lock();
        self.ensure_attachable(&inner, stream.into())?;
        inner.stdio.attach_output(stream)
    }

    // A panic while holding the lock cannot leave `Inner` half-updated:
    // every transition is a single assignment.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn transition(&self, inner: &mut Inner, next: ProcessStatus) {
        debug!(
            "{}: {} -> {}",
            self.command_line.program(),
            inner.status,
            next
        );
        inner.status = next;
        self.status_tx.send_replace(next);
    }

    fn ensure_startable(&self, inner: &Inner) -> Result<()> {
        match inner.status {
            ProcessStatus::Idle => Ok(()),
            status if status.is_running() => Err(ProcessError::AlreadyRunning {
                program: self.command_line.program().to_string(),
            }),
            _ => Err(self.spent()),
        }
    }

    fn ensure_attachable(&self, inner: &Inner, stream: StdStream) -> Result<()> {
        match inner.status {
            ProcessStatus::Idle => Ok(()),
            status if status.is_running() => Err(ProcessError::PipeRunning { stream }),
            _ => Err(self.spent()),
        }
    }

    fn not_running(&self) -> ProcessError {
        ProcessError::NotRunning {
            program: self.command_line.program().to_string(),
        }
    }

    fn spent(&self) -> ProcessError {
        ProcessError::Spent {
            program: self.command_line.program().to_string(),
        }
    }

    /// Spawn the child and move to `Running`. Returns the pid.
    ///
    /// The child ends of attached pipes are released only after a successful
    /// spawn; on failure the caller's pipes stay attached for a retry.
    fn spawn_locked(&self, inner: &mut Inner) -> Result<u32> {
        let [stdin, stdout, stderr] = inner.stdio.stdio(self.options.null_stdio)?;

        let mut cmd = Command::new(self.command_line.program());
        cmd.args(self.command_line.arguments())
            .stdin(stdin)
            .stdout(stdout)
            .stderr(stderr);

        if let Some(ref dir) = self.options.current_dir {
            cmd.current_dir(dir);
        }
        for (key, value) in &self.options.env_vars {
            cmd.env(key, value);
        }

        info!("Spawning {}", self.command_line);

        let child = cmd.spawn().map_err(|source| {
            error!("Failed to spawn {}: {}", self.command_line.program(), source);
            ProcessError::SpawnFailed {
                program: self.command_line.program().to_string(),
                source,
            }
        })?;
        drop(cmd);
        inner.stdio.release();

        let pid = child.id();
        info!("Spawned process with PID {}", pid);

        inner.child = Some(child);
        self.transition(inner, ProcessStatus::Running { pid });
        Ok(pid)
    }

    fn try_reap_locked(&self, inner: &mut Inner) -> Result<Option<ExitStatus>> {
        let Some(child) = inner.child.as_mut() else {
            return Ok(None);
        };
        let pid = child.id();

        match child.try_wait() {
            Ok(Some(status)) => {
                debug!("Reaped process {}: {}", pid, status);
                inner.child = None;
                self.transition(inner, ProcessStatus::exited(status));
                Ok(Some(status))
            }
            Ok(None) => Ok(None),
            Err(source) => {
                error!("Failed to wait for process {}: {}", pid, source);
                self.transition(inner, ProcessStatus::Zombie { pid });
                Err(ProcessError::WaitFailed { pid, source })
            }
        }
    }

    /// Poll until the child exits and reap it.
    ///
    /// Reaping only ever happens under the lock, so a concurrent `stop()`
    /// can never signal a recycled pid. Returns `Ok(None)` if someone else
    /// reaped the child first.
    fn reap_blocking(&self) -> Result<Option<ExitStatus>> {
        loop {
            {
                let mut inner = self.lock();
                if inner.child.is_none() {
                    debug!("{} was reaped by another caller", self.command_line.program());
                    return Ok(None);
                }
                if let Some(status) = self.try_reap_locked(&mut inner)? {
                    return Ok(Some(status));
                }
            }
            thread::sleep(self.options.reap_interval);
        }
    }
}

impl Supervised for ProcessHandle {
    fn is_running(&self) -> bool {
        ProcessHandle::is_running(self)
    }

    fn kill_for_inactivity(&self, idle: Duration) -> bool {
        let mut inner = self.lock();
        if !matches!(inner.status, ProcessStatus::Running { .. }) {
            return false;
        }
        let Some(child) = inner.child.as_mut() else {
            return false;
        };
        let pid = child.id();

        match child.kill() {
            Ok(()) => {
                warn!(
                    "Killed process {} ({}) after {:?} without output",
                    pid,
                    self.command_line.program(),
                    idle
                );
                true
            }
            Err(e) => {
                warn!("Watchdog failed to kill process {}: {}", pid, e);
                false
            }
        }
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        let inner = self.inner.get_mut().unwrap_or_else(PoisonError::into_inner);
        let Some(child) = inner.child.as_mut() else {
            return;
        };
        let pid = child.id();

        match child.try_wait() {
            Ok(Some(status)) => debug!("Reaped process {} on drop: {}", pid, status),
            Ok(None) => warn!(
                "Dropping handle while process {} ({}) is still running",
                pid,
                self.command_line.program()
            ),
            Err(e) => warn!("Failed to reap process {} on drop: {}", pid, e),
        }
    }
}

/// Read `reader` to EOF in `delimiter`-terminated chunks, stamping `clock` per chunk.
fn read_chunks<F>(
    reader: PipeReader,
    delimiter: u8,
    stream: OutputStream,
    clock: &ActivityClock,
    on_chunk: &mut F,
) -> Result<u64>
where
    F: FnMut(&[u8]),
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    let mut chunks = 0;

    loop {
        buf.clear();
        match reader.read_until(delimiter, &mut buf) {
            Ok(0) => return Ok(chunks),
            Ok(_) => {
                clock.touch();
                chunks += 1;
                on_chunk(&buf);
            }
            Err(source) => {
                return Err(ProcessError::StreamRead {
                    stream: stream.into(),
                    source,
                });
            }
        }
    }
}
