//! Real processes and real signals

use super::{ChildProcess, LaunchCommand, Signal, SignalSource, Spawner};
use async_trait::async_trait;
use std::io;
use std::process::Stdio;
use tokio::process::{Child, Command};

/// Spawns children that share the launcher's stdin, stdout and stderr
#[derive(Debug, Clone, Copy, Default)]
pub struct OsSpawner;

impl Spawner for OsSpawner {
    fn spawn(&self, command: &LaunchCommand) -> io::Result<Box<dyn ChildProcess>> {
        let child = Command::new(&command.program)
            .args(&command.args)
            .envs(command.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()?;
        Ok(Box::new(OsChild { child }))
    }
}

/// A `tokio::process::Child` behind the supervisor's seam
pub struct OsChild {
    child: Child,
}

#[async_trait]
impl ChildProcess for OsChild {
    fn id(&self) -> Option<u32> {
        self.child.id()
    }

    #[cfg(unix)]
    fn signal(&mut self, signal: Signal) -> io::Result<()> {
        // Already reaped: nothing left to signal
        let Some(pid) = self.child.id() else {
            return Ok(());
        };
        let pid = libc::pid_t::try_from(pid)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;

        // SAFETY: kill(2) takes plain integers and has no memory-safety
        // preconditions. The pid belongs to our child, which has not been reaped.
        let rc = unsafe { libc::kill(pid, signal.number()) };
        if rc == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }

    #[cfg(not(unix))]
    fn signal(&mut self, _signal: Signal) -> io::Result<()> {
        // No signal delivery outside unix; console control events already
        // reach the whole process group, so only a hard stop remains.
        self.child.start_kill()
    }

    async fn wait(&mut self) -> io::Result<Option<i32>> {
        let status = self.child.wait().await?;
        Ok(status.code())
    }
}

/// Interrupt and terminate notifications for the launcher process
///
/// Installing the handlers replaces the default "die immediately" behavior,
/// which is what lets the child shut down first.
pub struct OsSignals {
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
}

impl OsSignals {
    #[cfg(unix)]
    pub fn install() -> io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    #[cfg(not(unix))]
    pub fn install() -> io::Result<Self> {
        Ok(Self {})
    }
}

#[async_trait]
impl SignalSource for OsSignals {
    #[cfg(unix)]
    async fn recv(&mut self) -> Option<Signal> {
        tokio::select! {
            got = self.interrupt.recv() => got.map(|()| Signal::Interrupt),
            got = self.terminate.recv() => got.map(|()| Signal::Terminate),
        }
    }

    #[cfg(not(unix))]
    async fn recv(&mut self) -> Option<Signal> {
        tokio::signal::ctrl_c().await.ok().map(|()| Signal::Interrupt)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::error::LauncherError;
    use crate::supervisor::ProcessSupervisor;
    use std::path::PathBuf;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Yields one interrupt once `ready` exists, then stays silent
    struct InterruptWhenReady {
        ready: PathBuf,
        sent: bool,
    }

    #[async_trait]
    impl SignalSource for InterruptWhenReady {
        async fn recv(&mut self) -> Option<Signal> {
            if self.sent {
                return std::future::pending().await;
            }
            while !self.ready.exists() {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
            self.sent = true;
            Some(Signal::Interrupt)
        }
    }

    struct Never;

    #[async_trait]
    impl SignalSource for Never {
        async fn recv(&mut self) -> Option<Signal> {
            std::future::pending().await
        }
    }

    fn sh(script: &str) -> LaunchCommand {
        LaunchCommand {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
            env: vec![("LAUNCHER_TEST".to_string(), "7".to_string())],
        }
    }

    #[tokio::test]
    async fn exit_code_of_real_child() {
        let mut supervisor = ProcessSupervisor::new(OsSpawner, Never);
        let code = supervisor.run(&sh("exit $LAUNCHER_TEST")).await.unwrap();
        assert_eq!(code, 7);
    }

    #[tokio::test]
    async fn missing_program_fails_to_start() {
        let mut supervisor = ProcessSupervisor::new(OsSpawner, Never);
        let command = LaunchCommand {
            program: "/nonexistent/launcher-test-binary".to_string(),
            args: vec![],
            env: vec![],
        };
        let err = supervisor.run(&command).await.unwrap_err();
        assert!(matches!(err, LauncherError::Spawn { .. }));
    }

    #[tokio::test]
    async fn interrupt_reaches_real_child() {
        let temp = TempDir::new().unwrap();
        let ready = temp.path().join("ready");
        let script = format!(
            "trap 'exit 42' INT; touch '{}'; while :; do sleep 0.05; done",
            ready.display()
        );
        let signals = InterruptWhenReady { ready, sent: false };
        let mut supervisor = ProcessSupervisor::new(OsSpawner, signals);

        let code = tokio::time::timeout(Duration::from_secs(10), supervisor.run(&sh(&script)))
            .await
            .expect("child should exit after the forwarded interrupt")
            .unwrap();

        assert_eq!(code, 42);
        assert_eq!(supervisor.forwarded(), 1);
    }
}
