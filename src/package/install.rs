//! Package installation.
//!
//! The whole pending set goes to the installer in a single invocation.
//! Success means every spec got installed; any failure fails the batch.

use std::future::Future;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::reconcile::PendingInstalls;
use crate::log;
use crate::utils::exec::{Cmd, ExecError, NPM_FILTER};

#[derive(Debug, Error)]
#[error("failed to install {}", specs.join(", "))]
pub struct InstallError {
    pub specs: Vec<String>,
    #[source]
    pub source: ExecError,
}

/// Installs package specs (`name` or `name@range`) into the project.
pub trait Installer {
    fn install(&self, specs: &[String], save: bool)
    -> impl Future<Output = Result<(), InstallError>>;
}

/// Runs the configured package manager command (`npm install` by default).
#[derive(Debug, Clone)]
pub struct NpmInstaller {
    command: Vec<String>,
    root: PathBuf,
}

impl NpmInstaller {
    pub fn new(command: &[String], root: &Path) -> Self {
        Self {
            command: command.to_vec(),
            root: root.to_path_buf(),
        }
    }

    fn build(&self, specs: &[String], save: bool) -> Cmd {
        Cmd::from_slice(&self.command)
            .arg(if save { "--save" } else { "--no-save" })
            .args(specs)
            .cwd(&self.root)
            .filter(&NPM_FILTER)
    }
}

impl Installer for NpmInstaller {
    async fn install(&self, specs: &[String], save: bool) -> Result<(), InstallError> {
        self.build(specs, save)
            .run()
            .await
            .map(|_| ())
            .map_err(|source| InstallError {
                specs: specs.to_vec(),
                source,
            })
    }
}

/// Install `pending` in one batch; an empty set does nothing.
pub async fn install_pending<I: Installer>(
    installer: &I,
    pending: &PendingInstalls,
    save: bool,
) -> Result<(), InstallError> {
    if pending.is_empty() {
        return Ok(());
    }

    let specs = pending.specs();
    log!("install"; "installing {}", specs.join(", "));
    installer.install(&specs, save).await?;
    log!("install"; "installed {} package(s)", specs.len());
    Ok(())
}
