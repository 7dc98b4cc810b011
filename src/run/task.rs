//! External process execution with per-stream line delivery.
//!
//! `TaskRun` spawns the configured command, captures stdout and stderr
//! concurrently, and publishes lifecycle and line notifications on a
//! bounded channel in the order they occurred on each stream.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{LineSplitter, RunCommand};

/// Default capacity of the notification channel.
pub const DEFAULT_CHANNEL_BUFFER: usize = 256;

/// Default timeout for graceful process termination.
pub const DEFAULT_TERMINATE_TIMEOUT: Duration = Duration::from_secs(5);

/// Shell used to interpret the command string.
const DEFAULT_SHELL: &str = "/bin/sh";

/// Read buffer size for each pipe reader.
const READ_BUFFER_SIZE: usize = 4096;

/// Which child stream a line was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamOrigin {
    Stdout,
    Stderr,
}

/// Lifecycle of a single `TaskRun`.
///
/// A run is single-use: once it leaves `Idle` it never returns to it.
/// The only exception is a failed spawn, which never leaves `Idle` in
/// the first place, so `start()` may be retried.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunState {
    #[default]
    Idle,
    Running,
    Stopping,
    Stopped,
}

/// Error type for task lifecycle operations.
#[derive(thiserror::Error, Debug)]
pub enum TaskRunError {
    /// The command could not be launched. The run stays `Idle` and
    /// `start()` may be retried.
    #[error("failed to spawn command: {0}")]
    Spawn(#[source] std::io::Error),
    /// `start()` was called while a run is in progress.
    #[error("task is already running")]
    AlreadyRunning,
    /// The operation is not valid in the current lifecycle state.
    #[error("operation not valid in state {0:?}")]
    InvalidState(RunState),
}

/// Notification published to the observer channel.
///
/// Per stream, `Line` notifications arrive in exactly the order the
/// child produced the bytes; no ordering is guaranteed between the two
/// streams. `Stopped` is sent exactly once, after both streams have
/// drained, and no `Line` follows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskNotification {
    /// The child process has started.
    Started,
    /// One line was read from the child.
    Line {
        text: String,
        origin: StreamOrigin,
    },
    /// The child has exited and both streams are drained.
    Stopped,
}

/// Runs one external command and streams its output as notifications.
///
/// Created together with the receiving half of a bounded channel; a slow
/// receiver fills the channel and stalls the pipe readers (backpressure)
/// rather than losing lines.
pub struct TaskRun {
    command: RunCommand,
    tx: Sender<TaskNotification>,
    state: Arc<watch::Sender<RunState>>,
    cancel: CancellationToken,
}

impl TaskRun {
    /// Create a run for the given command with the default channel capacity.
    #[must_use]
    pub fn new(command: RunCommand) -> (Self, Receiver<TaskNotification>) {
        Self::with_capacity(command, DEFAULT_CHANNEL_BUFFER)
    }

    /// Create a run with an explicit notification channel capacity.
    #[must_use]
    pub fn with_capacity(
        command: RunCommand,
        capacity: usize,
    ) -> (Self, Receiver<TaskNotification>) {
        let (tx, rx) = mpsc::channel(capacity);
        let run = Self {
            command,
            tx,
            state: Arc::new(watch::Sender::new(RunState::Idle)),
            cancel: CancellationToken::new(),
        };
        (run, rx)
    }

    /// The command descriptor this run was created with.
    #[must_use]
    pub fn command(&self) -> &RunCommand {
        &self.command
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> RunState {
        *self.state.borrow()
    }

    /// Watch lifecycle transitions, e.g. to await `Stopped`.
    #[must_use]
    pub fn state_updates(&self) -> watch::Receiver<RunState> {
        self.state.subscribe()
    }

    /// Spawn the command and begin asynchronous line delivery.
    ///
    /// The `Started` notification is sent before this returns, so the
    /// observer always sees it ahead of any line.
    ///
    /// # Errors
    ///
    /// `TaskRunError::AlreadyRunning` while `Running` or `Stopping`,
    /// `TaskRunError::InvalidState` once `Stopped` (a run is single-use),
    /// and `TaskRunError::Spawn` if the command could not be launched, in
    /// which case the state remains `Idle` and `start()` may be retried.
    pub async fn start(&mut self) -> Result<(), TaskRunError> {
        self.start_with_shell(DEFAULT_SHELL).await
    }

    /// Spawn using a custom shell binary (for testing).
    ///
    /// # Errors
    ///
    /// Same as [`start`](Self::start).
    pub async fn start_with_shell(&mut self, shell: &str) -> Result<(), TaskRunError> {
        match self.state() {
            RunState::Idle => {}
            RunState::Running | RunState::Stopping => {
                return Err(TaskRunError::AlreadyRunning);
            }
            state @ RunState::Stopped => {
                return Err(TaskRunError::InvalidState(state));
            }
        }

        let mut child = self.spawn_child(shell).map_err(TaskRunError::Spawn)?;
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        transition(&self.state, RunState::Running);
        tracing::info!(
            command = %self.command.command(),
            pid = ?child.id(),
            "task started"
        );

        if self.tx.send(TaskNotification::Started).await.is_err() {
            // The receiver is already gone; keep running so lifecycle
            // bookkeeping stays truthful.
            tracing::warn!("notification receiver dropped before start");
        }

        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = stdout {
            readers.push(tokio::spawn(read_lines(
                stdout,
                StreamOrigin::Stdout,
                self.tx.clone(),
            )));
        }
        if let Some(stderr) = stderr {
            readers.push(tokio::spawn(read_lines(
                stderr,
                StreamOrigin::Stderr,
                self.tx.clone(),
            )));
        }

        tokio::spawn(supervise(
            child,
            readers,
            self.tx.clone(),
            Arc::clone(&self.state),
            self.cancel.clone(),
        ));

        Ok(())
    }

    /// Request termination of the running process and its process group.
    ///
    /// Returns immediately after flipping the state to `Stopping`; the
    /// child receives SIGTERM, then SIGKILL after
    /// [`DEFAULT_TERMINATE_TIMEOUT`]. Completion is observable through the
    /// `Stopped` notification, which is guaranteed to be the last one.
    /// Safe to call from any task at any time after `start()`.
    ///
    /// # Errors
    ///
    /// `TaskRunError::InvalidState` unless the run is currently `Running`;
    /// in that case no side effects occur.
    pub fn stop(&self) -> Result<(), TaskRunError> {
        let requested = self.state.send_if_modified(|state| {
            if *state == RunState::Running {
                *state = RunState::Stopping;
                true
            } else {
                false
            }
        });

        if !requested {
            return Err(TaskRunError::InvalidState(self.state()));
        }

        tracing::info!("stop requested");
        self.cancel.cancel();
        Ok(())
    }

    fn spawn_child(&self, shell: &str) -> std::io::Result<Child> {
        let mut cmd = Command::new(shell);
        cmd.arg("-c")
            .arg(self.command.command())
            .envs(self.command.environment())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        // Own process group, so stop() can signal the whole child tree.
        #[cfg(unix)]
        cmd.process_group(0);

        cmd.spawn()
    }
}

fn transition(state: &watch::Sender<RunState>, to: RunState) {
    let from = state.send_replace(to);
    if from != to {
        tracing::debug!(?from, ?to, "run state transition");
    }
}

/// Read one pipe to EOF, publishing each completed line in order.
async fn read_lines<R>(mut pipe: R, origin: StreamOrigin, tx: Sender<TaskNotification>)
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut splitter = LineSplitter::new();
    let mut buf = [0u8; READ_BUFFER_SIZE];
    let mut delivering = true;

    loop {
        match pipe.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                for text in splitter.push(&buf[..n]) {
                    if delivering
                        && tx
                            .send(TaskNotification::Line { text, origin })
                            .await
                            .is_err()
                    {
                        // Receiver gone. Keep draining so the child never
                        // blocks on a full pipe.
                        delivering = false;
                    }
                }
            }
            Err(err) => {
                tracing::warn!(?origin, error = %err, "pipe read failed");
                break;
            }
        }
    }

    if delivering {
        if let Some(text) = splitter.finish() {
            let _ = tx.send(TaskNotification::Line { text, origin }).await;
        }
    }
}

/// Wait for process exit (natural or requested), drain the readers, then
/// publish the single `Stopped` notification.
async fn supervise(
    mut child: Child,
    readers: Vec<JoinHandle<()>>,
    tx: Sender<TaskNotification>,
    state: Arc<watch::Sender<RunState>>,
    cancel: CancellationToken,
) {
    let status = tokio::select! {
        status = child.wait() => status,
        () = cancel.cancelled() => terminate(&mut child).await,
    };

    transition(&state, RunState::Stopping);
    match status {
        Ok(status) => tracing::info!(%status, "task exited"),
        Err(err) => tracing::warn!(error = %err, "failed to reap task"),
    }

    // The pipes stay open until every process in the group that inherited
    // them exits; the readers finish once they hit EOF, so every line
    // produced before exit is delivered.
    for reader in readers {
        let _ = reader.await;
    }

    transition(&state, RunState::Stopped);
    let _ = tx.send(TaskNotification::Stopped).await;
}

/// Terminate the child's process group: SIGTERM, a grace period, SIGKILL.
async fn terminate(child: &mut Child) -> std::io::Result<std::process::ExitStatus> {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        let pgid = Pid::from_raw(i32::try_from(pid).unwrap_or(i32::MAX));
        let _ = killpg(pgid, Signal::SIGTERM);

        if let Ok(status) = tokio::time::timeout(DEFAULT_TERMINATE_TIMEOUT, child.wait()).await {
            return status;
        }

        tracing::warn!("grace period elapsed, sending SIGKILL");
        let _ = killpg(pgid, Signal::SIGKILL);
    }

    #[cfg(not(unix))]
    child.kill().await?;

    child.wait().await
}
