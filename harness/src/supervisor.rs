//! Service process supervision
//!
//! Spawns the supervised service with piped output, delivers signals,
//! probes liveness and reaps the process on teardown. A
//! [`ServiceProcess`] is owned exclusively by the scenario that spawned
//! it; lifecycle state changes only through the methods here.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio::time::sleep;

use crate::error::{HarnessError, HarnessResult};

/// Fixed interval for all bounded polling loops.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Lifecycle state of a supervised process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Running,
    Exited,
    Killed,
}

/// A child service process plus the metadata needed to supervise it.
#[derive(Debug)]
pub struct ServiceProcess {
    child: Child,
    pid: i32,
    command: String,
    config_file: Option<PathBuf>,
    state: ProcessState,
}

impl ServiceProcess {
    /// Launch `command` with piped stdout/stderr. When `config_file` is
    /// given, `--config-file=<path>` is appended to the arguments.
    ///
    /// `kill_on_drop` backs up explicit teardown: a handle dropped
    /// mid-scenario still takes its child down.
    pub fn spawn<I, S>(command: &str, args: I, config_file: Option<&Path>) -> HarnessResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = Command::new(command);
        cmd.args(args);
        if let Some(path) = config_file {
            cmd.arg(format!("--config-file={}", path.display()));
        }
        cmd.stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|e| HarnessError::Spawn {
            command: command.to_string(),
            source: e,
        })?;

        let pid = child.id().unwrap_or(0) as i32;
        tracing::debug!("🚀 Spawned '{}' (PID: {})", command, pid);

        Ok(Self {
            child,
            pid,
            command: command.to_string(),
            config_file: config_file.map(Path::to_path_buf),
            state: ProcessState::Running,
        })
    }

    pub fn pid(&self) -> i32 {
        self.pid
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn config_file(&self) -> Option<&Path> {
        self.config_file.as_deref()
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    /// Take ownership of the stderr pipe. Each pipe can be taken once.
    pub fn take_stderr(&mut self) -> Option<ChildStderr> {
        self.child.stderr.take()
    }

    /// Take ownership of the stdout pipe. Each pipe can be taken once.
    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.child.stdout.take()
    }

    /// Deliver `sig` to the process. ESRCH maps to
    /// [`HarnessError::ProcessNotFound`].
    pub fn signal(&self, sig: Signal) -> HarnessResult<()> {
        signal::kill(Pid::from_raw(self.pid), sig).map_err(|errno| match errno {
            Errno::ESRCH => HarnessError::ProcessNotFound { pid: self.pid },
            other => HarnessError::Io(std::io::Error::from_raw_os_error(other as i32)),
        })
    }

    /// Signal-0 liveness probe. Absence of the process, or any probe
    /// failure, is "not alive" rather than an error.
    pub fn is_alive(&self) -> bool {
        signal::kill(Pid::from_raw(self.pid), None).is_ok()
    }

    /// Non-blocking exit check; records `Exited` if the child is gone.
    pub fn try_wait(&mut self) -> HarnessResult<Option<ExitStatus>> {
        match self.child.try_wait()? {
            Some(status) => {
                if self.state == ProcessState::Running {
                    self.state = ProcessState::Exited;
                }
                Ok(Some(status))
            }
            None => Ok(None),
        }
    }

    /// Wait for the child to exit and reap it.
    pub async fn wait(&mut self) -> HarnessResult<ExitStatus> {
        let status = self.child.wait().await?;
        if self.state == ProcessState::Running {
            self.state = ProcessState::Exited;
        }
        Ok(status)
    }

    /// Forcefully terminate and reap. Idempotent once the process has
    /// already exited.
    pub async fn kill_and_wait(&mut self) -> HarnessResult<ExitStatus> {
        if self.state == ProcessState::Running {
            if let Err(e) = self.child.kill().await {
                tracing::debug!("kill for PID {} returned: {}", self.pid, e);
            }
            self.state = ProcessState::Killed;
        }
        let status = self.child.wait().await?;
        tracing::debug!("🛑 Reaped PID {} ({})", self.pid, status);
        Ok(status)
    }
}

/// Polls `predicate` every [`POLL_INTERVAL`] until it returns true or
/// `timeout` elapses. Returns the final evaluation of `predicate`, so
/// callers can assert either success or persistent failure.
pub async fn wait_until<F>(mut predicate: F, timeout: Duration) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + timeout;
    while !predicate() {
        if Instant::now() >= deadline {
            break;
        }
        sleep(POLL_INTERVAL).await;
    }
    predicate()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn spawn_missing_executable_is_a_spawn_error() {
        let err = ServiceProcess::spawn(
            "/nonexistent/harness-test-binary",
            std::iter::empty::<&str>(),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, HarnessError::Spawn { .. }));
    }

    #[tokio::test]
    async fn killed_process_stops_being_alive() {
        let mut service = ServiceProcess::spawn("sleep", ["30"], None).unwrap();
        assert!(service.is_alive());
        assert_eq!(service.state(), ProcessState::Running);

        service.kill_and_wait().await.unwrap();
        assert_eq!(service.state(), ProcessState::Killed);
        assert!(wait_until(|| !service.is_alive(), Duration::from_secs(5)).await);
    }

    #[tokio::test]
    async fn kill_and_wait_is_idempotent() {
        let mut service = ServiceProcess::spawn("sleep", ["30"], None).unwrap();
        service.kill_and_wait().await.unwrap();
        service.kill_and_wait().await.unwrap();
        assert_eq!(service.state(), ProcessState::Killed);
    }

    #[tokio::test]
    async fn signal_to_reaped_process_is_process_not_found() {
        let mut service = ServiceProcess::spawn("sleep", ["30"], None).unwrap();
        service.kill_and_wait().await.unwrap();

        let err = service.signal(Signal::SIGHUP).unwrap_err();
        assert!(matches!(err, HarnessError::ProcessNotFound { .. }));
    }

    #[tokio::test]
    async fn wait_until_reports_final_evaluation() {
        assert!(wait_until(|| true, Duration::from_millis(100)).await);

        let start = Instant::now();
        assert!(!wait_until(|| false, Duration::from_millis(300)).await);
        assert!(start.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test]
    async fn wait_until_picks_up_a_flipped_predicate() {
        let start = Instant::now();
        let flipped = wait_until(
            || start.elapsed() >= Duration::from_millis(250),
            Duration::from_secs(5),
        )
        .await;
        assert!(flipped);
    }
}
