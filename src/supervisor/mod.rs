//! Child process supervision
//!
//! One control loop waits on two event sources: termination signals sent to
//! the launcher and the child's exit. Signals are relayed to the child; the
//! loop only ends when the child does.
//!
//! ```text
//! NotStarted ──spawn ok──▶ Running ──child exits──▶ Exited(code)
//!     │
//!     └──spawn error──▶ FailedToStart
//! ```

mod os;

pub use os::{OsChild, OsSignals, OsSpawner};

use crate::error::{LauncherError, LauncherResult};
use async_trait::async_trait;
use std::io;
use tracing::{debug, warn};

/// Termination signals relayed to the child
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Interrupt,
    Terminate,
}

impl Signal {
    /// Conventional signal number
    pub fn number(self) -> i32 {
        match self {
            Self::Interrupt => libc::SIGINT,
            Self::Terminate => libc::SIGTERM,
        }
    }
}

/// Program, arguments and extra environment for the child
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchCommand {
    pub program: String,
    pub args: Vec<String>,
    /// Added to (not replacing) the launcher's own environment
    pub env: Vec<(String, String)>,
}

/// A started child process
#[async_trait]
pub trait ChildProcess: Send {
    fn id(&self) -> Option<u32>;

    /// Deliver `signal` to the child
    fn signal(&mut self, signal: Signal) -> io::Result<()>;

    /// Wait for exit. `None` when no exit code is available (killed by a signal).
    async fn wait(&mut self) -> io::Result<Option<i32>>;
}

/// Starts child processes
pub trait Spawner: Send + Sync {
    fn spawn(&self, command: &LaunchCommand) -> io::Result<Box<dyn ChildProcess>>;
}

/// Stream of termination signals delivered to the launcher
#[async_trait]
pub trait SignalSource: Send {
    /// Next signal, or `None` once the source is closed
    async fn recv(&mut self) -> Option<Signal>;
}

/// Lifecycle of the supervised child
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    NotStarted,
    Running,
    Exited(i32),
    FailedToStart,
}

/// Runs one child to completion while relaying signals to it
pub struct ProcessSupervisor<P, S> {
    spawner: P,
    signals: S,
    state: SupervisorState,
    forwarded: u32,
}

impl<P: Spawner, S: SignalSource> ProcessSupervisor<P, S> {
    pub fn new(spawner: P, signals: S) -> Self {
        Self {
            spawner,
            signals,
            state: SupervisorState::NotStarted,
            forwarded: 0,
        }
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    /// Number of signals relayed to the child so far
    pub fn forwarded(&self) -> u32 {
        self.forwarded
    }

    /// Start `command` and return its exit code once it terminates
    ///
    /// A child without an exit code (terminated by a signal) reports 0.
    pub async fn run(&mut self, command: &LaunchCommand) -> LauncherResult<i32> {
        let mut child = match self.spawner.spawn(command) {
            Ok(child) => child,
            Err(e) => {
                self.state = SupervisorState::FailedToStart;
                return Err(LauncherError::spawn(&command.program, e));
            }
        };
        self.state = SupervisorState::Running;
        debug!(pid = ?child.id(), "Started {}", command.program);

        loop {
            tokio::select! {
                status = child.wait() => {
                    let status = status.map_err(|source| LauncherError::ChildWait { source })?;
                    if status.is_none() {
                        debug!("Child terminated without an exit code");
                    }
                    let code = status.unwrap_or(0);
                    self.state = SupervisorState::Exited(code);
                    return Ok(code);
                }
                Some(signal) = self.signals.recv() => {
                    debug!(?signal, "Forwarding signal to child");
                    match child.signal(signal) {
                        Ok(()) => self.forwarded += 1,
                        Err(e) => warn!("Could not forward {:?} to child: {}", signal, e),
                    }
                }
            }
        }
    }
}
