//! Launching and stopping the supervised script.

use std::ffi::OsString;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use thiserror::Error;
use tokio::process::Child;

use crate::debug;
use crate::utils::exec::{Cmd, ExecError};

#[derive(Debug, Error)]
#[error("failed to start the script")]
pub struct LaunchError(#[from] pub ExecError);

/// How the script ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitOutcome {
    pub code: Option<i32>,
    pub signal: Option<i32>,
}

impl ExitOutcome {
    pub fn from_status(status: ExitStatus) -> Self {
        #[cfg(unix)]
        let signal = std::os::unix::process::ExitStatusExt::signal(&status);
        #[cfg(not(unix))]
        let signal = None;

        Self {
            code: status.code(),
            signal,
        }
    }

    /// Exit code to mirror: the child's code, `128 + signal`, or 1.
    pub fn exit_code(&self) -> i32 {
        match (self.code, self.signal) {
            (Some(code), _) => code,
            (None, Some(signal)) => 128 + signal,
            (None, None) => 1,
        }
    }
}

impl fmt::Display for ExitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |v: Option<i32>| v.map_or_else(|| "none".to_string(), |v| v.to_string());
        write!(f, "exit code: {}, signal: {}", show(self.code), show(self.signal))
    }
}

/// Starts the script.
pub trait Launcher {
    type Child: RunningChild;

    fn spawn(&self) -> Result<Self::Child, LaunchError>;
}

/// Handle to a started script.
pub trait RunningChild {
    /// Ask the process to stop; completion is observed through [`RunningChild::wait`].
    fn kill(&mut self);

    fn wait(&mut self) -> impl Future<Output = std::io::Result<ExitOutcome>>;
}

/// Runs `<runtime command> <script> <args...>` with inherited stdio.
#[derive(Debug, Clone)]
pub struct NodeLauncher {
    command: Vec<OsString>,
    cwd: PathBuf,
}

impl NodeLauncher {
    pub fn new(command: Vec<OsString>, cwd: &Path) -> Self {
        Self {
            command,
            cwd: cwd.to_path_buf(),
        }
    }
}

impl Launcher for NodeLauncher {
    type Child = NodeChild;

    fn spawn(&self) -> Result<NodeChild, LaunchError> {
        let child = Cmd::from_slice(&self.command).cwd(&self.cwd).spawn()?;
        Ok(NodeChild(child))
    }
}

pub struct NodeChild(Child);

impl RunningChild for NodeChild {
    /// SIGTERM on unix so the script can run its shutdown handlers.
    fn kill(&mut self) {
        #[cfg(unix)]
        if let Some(pid) = self.0.id() {
            use nix::sys::signal::{Signal, kill};
            use nix::unistd::Pid;

            match kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
                Ok(()) => return,
                Err(e) => debug!("autobahn"; "SIGTERM failed: {}", e),
            }
        }
        if let Err(e) = self.0.start_kill() {
            debug!("autobahn"; "kill: {}", e);
        }
    }

    async fn wait(&mut self) -> std::io::Result<ExitOutcome> {
        self.0.wait().await.map(ExitOutcome::from_status)
    }
}
