//! Process supervisor.
//!
//! Drives resolution cycles and the script process:
//!
//! ```text
//! Idle ──start/change──► Resolving ──ok──► Running ──change──► Terminating
//!  ▲                         │                │                      │
//!  ├──── error (watch) ──────┘                │                      │ exit observed
//!  └──────────── script exits ────────────────┘                      ▼
//!                                                                 Resolving
//! ```
//!
//! At most one script process exists at any time. Cycles never overlap: a
//! cycle runs to completion before the next event is looked at, and events
//! that arrived meanwhile are discarded.

mod cycle;
mod process;
mod watch;


use std::future::pending;

use thiserror::Error;
use tokio::sync::watch::Receiver;

pub use cycle::{CycleError, Disposition, Pipeline, RunMode};
pub use process::{ExitOutcome, Launcher, NodeLauncher, RunningChild};
pub use watch::{PollWatchSet, WatchSet};

use crate::logger::{status_error, status_reset, status_success, status_warning};
use crate::package::Installer;
use crate::{debug, log};

/// Exit code after Ctrl+C.
pub const INTERRUPTED: i32 = 130;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error(transparent)]
    Cycle(#[from] CycleError),

    #[error("failed to watch files")]
    Watch(#[from] notify::Error),

    #[error("failed to wait for the script")]
    Wait(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Idle,
    Resolving,
    Running,
    Terminating,
}

pub struct Supervisor<I, L: Launcher, W> {
    pipeline: Pipeline<I>,
    launcher: L,
    watch: W,
    shutdown: Receiver<bool>,
    state: SupervisorState,
    /// Set for the whole duration of a cycle.
    resolving: bool,
    child: Option<L::Child>,
}

impl<I, L, W> Supervisor<I, L, W>
where
    I: Installer,
    L: Launcher,
    W: WatchSet,
{
    pub fn new(pipeline: Pipeline<I>, launcher: L, watch: W, shutdown: Receiver<bool>) -> Self {
        Self {
            pipeline,
            launcher,
            watch,
            shutdown,
            state: SupervisorState::Idle,
            resolving: false,
            child: None,
        }
    }

    /// Run until the script exits (`Once`) or until Ctrl+C (`Watch`).
    ///
    /// Returns the process exit code. Errors are fatal.
    pub async fn run(mut self, mode: RunMode) -> Result<i32, SupervisorError> {
        self.pipeline.prepare()?;
        match mode {
            RunMode::Once => self.run_once().await,
            RunMode::Watch => self.run_watch().await,
        }
    }

    async fn run_once(&mut self) -> Result<i32, SupervisorError> {
        self.set_state(SupervisorState::Resolving);
        let plan = self.pipeline.run().await?;
        debug!(
            "autobahn"; "{} local file(s), installed [{}]",
            plan.visited.len(),
            plan.installed.join(", ")
        );
        if self.interrupted() {
            return Ok(INTERRUPTED);
        }
        self.start()?;

        tokio::select! {
            outcome = wait_child(&mut self.child) => {
                let outcome = outcome?;
                self.child = None;
                self.set_state(SupervisorState::Idle);
                log!("autobahn"; "script exited, {}", outcome);
                Ok(outcome.exit_code())
            }
            _ = shutdown_requested(&mut self.shutdown) => {
                self.terminate().await?;
                Ok(INTERRUPTED)
            }
        }
    }

    async fn run_watch(&mut self) -> Result<i32, SupervisorError> {
        self.cycle().await?;

        loop {
            if self.interrupted() {
                self.terminate().await?;
                return Ok(INTERRUPTED);
            }

            tokio::select! {
                path = self.watch.changed() => {
                    log!("watch"; "changed: {}", path.display());
                    self.terminate().await?;
                    self.cycle().await?;
                }
                outcome = wait_child(&mut self.child) => {
                    let outcome = outcome?;
                    self.child = None;
                    self.set_state(SupervisorState::Idle);
                    log!("autobahn"; "script exited, {}", outcome);
                    status_warning("waiting for changes before restarting");
                }
                _ = shutdown_requested(&mut self.shutdown) => {}
            }
        }
    }

    /// `Idle → Resolving → Running | Idle`. Only fatal errors are returned.
    async fn cycle(&mut self) -> Result<(), SupervisorError> {
        debug_assert!(self.child.is_none());
        if self.resolving {
            return Ok(());
        }

        self.resolving = true;
        self.set_state(SupervisorState::Resolving);
        let result = self.pipeline.run().await;
        self.resolving = false;
        self.watch.discard_pending();

        match result {
            Ok(plan) => {
                debug!("autobahn"; "installed [{}]", plan.installed.join(", "));
                self.watch.rearm(&plan.visited)?;
                status_success(&format!(
                    "{} ready, watching {} file(s)",
                    self.pipeline.entry().display(),
                    self.watch.paths().len()
                ));
                self.start()?;
            }
            Err(err) => match err.disposition(RunMode::Watch) {
                Disposition::Idle => {
                    self.set_state(SupervisorState::Idle);
                    status_error(&err.to_string(), &err.detail());
                    // Nothing armed yet: the entry script is the only file known.
                    if self.watch.paths().is_empty() {
                        let entry = self.pipeline.entry().to_path_buf();
                        self.watch.rearm(&[entry].into_iter().collect())?;
                    }
                }
                Disposition::Fatal => return Err(err.into()),
            },
        }
        Ok(())
    }

    fn start(&mut self) -> Result<(), SupervisorError> {
        status_reset();
        log!("autobahn"; "(re)starting");
        let child = self.launcher.spawn().map_err(CycleError::from)?;
        self.child = Some(child);
        self.set_state(SupervisorState::Running);
        Ok(())
    }

    /// `Running → Terminating → Idle`, returning once the exit is observed.
    async fn terminate(&mut self) -> Result<(), SupervisorError> {
        if let Some(mut child) = self.child.take() {
            self.set_state(SupervisorState::Terminating);
            child.kill();
            let outcome = child.wait().await?;
            debug!("autobahn"; "script stopped, {}", outcome);
        }
        self.set_state(SupervisorState::Idle);
        Ok(())
    }

    fn set_state(&mut self, next: SupervisorState) {
        if self.state != next {
            debug!("autobahn"; "{:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }

    fn interrupted(&self) -> bool {
        *self.shutdown.borrow()
    }
}

async fn wait_child<C: RunningChild>(child: &mut Option<C>) -> std::io::Result<ExitOutcome> {
    match child {
        Some(child) => child.wait().await,
        None => pending().await,
    }
}

/// Resolves once shutdown is requested; never if the sender is gone.
async fn shutdown_requested(rx: &mut Receiver<bool>) {
    if rx.wait_for(|&requested| requested).await.is_err() {
        pending::<()>().await;
    }
}
