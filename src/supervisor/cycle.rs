//! One resolution cycle: walk → reconcile → install.

use std::error::Error as _;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::process::LaunchError;
use crate::graph::{NodeResolver, ParseError, ResolveError, Resolver, VisitedSet, WalkError, walk};
use crate::log;
use crate::package::{
    Environment, InstallError, Installer, ManifestError, ManifestStore, NodeModules, PackageJson,
    install_pending, reconcile,
};

/// Whether the supervisor restarts on change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Once,
    Watch,
}

/// What the supervisor does after a failed cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Report and wait for the next change.
    Idle,
    /// Stop with exit code 1.
    Fatal,
}

#[derive(Debug, Error)]
pub enum CycleError {
    #[error("parse error")]
    Parse(#[source] ParseError),

    #[error("resolution failed")]
    Resolution(#[source] ResolveError),

    #[error("install failed")]
    Install(#[from] InstallError),

    #[error("manifest error")]
    Manifest(#[from] ManifestError),

    #[error("launch failed")]
    Launch(#[from] LaunchError),
}

impl From<WalkError> for CycleError {
    fn from(err: WalkError) -> Self {
        match err {
            WalkError::Parse(e) => Self::Parse(e),
            WalkError::Resolve(e) => Self::Resolution(e),
        }
    }
}

impl CycleError {
    pub fn disposition(&self, mode: RunMode) -> Disposition {
        match (self, mode) {
            (Self::Manifest(_) | Self::Launch(_), _) => Disposition::Fatal,
            (_, RunMode::Once) => Disposition::Fatal,
            (_, RunMode::Watch) => Disposition::Idle,
        }
    }

    /// Causes below the summary, one per line.
    pub fn detail(&self) -> String {
        let mut lines = Vec::new();
        let mut source = self.source();
        while let Some(err) = source {
            lines.push(err.to_string());
            source = err.source();
        }
        lines.join("\n")
    }
}

/// Outcome of a successful cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CyclePlan {
    /// Files to watch for the next restart.
    pub visited: VisitedSet,
    /// Specs handed to the installer, empty when nothing was missing.
    pub installed: Vec<String>,
}

/// Dependency pipeline for one entry script.
pub struct Pipeline<I> {
    entry: PathBuf,
    save: bool,
    resolver: Box<dyn Resolver>,
    environment: Box<dyn Environment>,
    manifest: Box<dyn ManifestStore>,
    installer: I,
}

impl<I: Installer> Pipeline<I> {
    /// Pipeline over the project rooted at `root`.
    pub fn new(entry: PathBuf, root: &Path, installer: I) -> Self {
        Self {
            entry,
            save: false,
            resolver: Box::new(NodeResolver::new()),
            environment: Box::new(NodeModules::new(root)),
            manifest: Box::new(PackageJson::new(root)),
            installer,
        }
    }

    pub fn save(mut self, save: bool) -> Self {
        self.save = save;
        self
    }

    pub fn entry(&self) -> &Path {
        &self.entry
    }

    /// One-time setup before the first cycle.
    ///
    /// With `save`, a missing manifest is created empty so the installer
    /// has somewhere to record the new entries.
    pub fn prepare(&self) -> Result<(), CycleError> {
        if self.save && self.manifest.read()?.is_none() {
            self.manifest.write_empty()?;
            log!("autobahn"; "created empty package.json");
        }
        Ok(())
    }

    pub async fn run(&self) -> Result<CyclePlan, CycleError> {
        let discovery = walk(self.resolver.as_ref(), &self.entry).await?;
        let manifest = self.manifest.read()?;
        let pending = reconcile(
            &discovery.externals,
            manifest.as_ref(),
            self.environment.as_ref(),
            self.resolver.as_ref(),
        );
        install_pending(&self.installer, &pending, self.save).await?;

        Ok(CyclePlan {
            visited: discovery.visited,
            installed: pending.specs(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::exec::ExecError;
    use parking_lot::Mutex;
    use std::fs;
    use tempfile::TempDir;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<Vec<String>>>,
    }

    impl Installer for Recorder {
        async fn install(&self, specs: &[String], _save: bool) -> Result<(), InstallError> {
            self.calls.lock().push(specs.to_vec());
            Ok(())
        }
    }

    fn write(root: &Path, rel: &str, content: &str) -> PathBuf {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    fn parse_error() -> CycleError {
        CycleError::Parse(ParseError {
            path: "a.js".into(),
            line: 1,
            column: 2,
            message: "Unexpected token".into(),
        })
    }

    fn install_error() -> CycleError {
        CycleError::Install(InstallError {
            specs: vec!["lodash".into()],
            source: ExecError::Spawn {
                program: "npm".into(),
                source: std::io::Error::other("offline"),
            },
        })
    }

    fn manifest_error() -> CycleError {
        CycleError::Manifest(ManifestError::Read {
            path: "package.json".into(),
            source: std::io::Error::other("denied"),
        })
    }

    #[test]
    fn test_disposition_table() {
        use Disposition::*;
        use RunMode::*;

        let resolution = CycleError::Resolution(ResolveError::NotFound {
            specifier: "./x".into(),
            base: "/app".into(),
        });
        assert_eq!(parse_error().disposition(Once), Fatal);
        assert_eq!(parse_error().disposition(Watch), Idle);
        assert_eq!(resolution.disposition(Once), Fatal);
        assert_eq!(resolution.disposition(Watch), Idle);
        assert_eq!(install_error().disposition(Once), Fatal);
        assert_eq!(install_error().disposition(Watch), Idle);
        assert_eq!(manifest_error().disposition(Once), Fatal);
        assert_eq!(manifest_error().disposition(Watch), Fatal);

        let launch = || {
            CycleError::Launch(LaunchError(ExecError::Spawn {
                program: "node".into(),
                source: std::io::Error::other("not found"),
            }))
        };
        assert_eq!(launch().disposition(Once), Fatal);
        assert_eq!(launch().disposition(Watch), Fatal);
    }

    #[test]
    fn test_detail_walks_sources() {
        let detail = install_error().detail();
        assert!(detail.starts_with("failed to install lodash"));
        assert!(detail.contains("offline"));
        assert!(parse_error().detail().contains("a.js:1:2: Unexpected token"));
    }

    #[tokio::test]
    async fn test_run_installs_missing_in_discovery_order() {
        let dir = TempDir::new().unwrap();
        let entry = write(dir.path(), "index.js", "require('./util');\nrequire('lodash');\n");
        write(dir.path(), "util.js", "require('chalk');\nrequire('fs');\n");

        let pipeline = Pipeline::new(entry, dir.path(), Recorder::default());
        let plan = pipeline.run().await.unwrap();

        assert_eq!(plan.installed, vec!["lodash", "chalk"]);
        assert_eq!(plan.visited.len(), 2);
        assert_eq!(*pipeline.installer.calls.lock(), vec![vec!["lodash", "chalk"]]);
    }

    #[tokio::test]
    async fn test_run_nothing_missing() {
        let dir = TempDir::new().unwrap();
        let entry = write(dir.path(), "index.js", "require('lodash');\n");
        write(dir.path(), "node_modules/lodash/package.json", r#"{"version":"4.17.21"}"#);
        write(dir.path(), "package.json", r#"{"dependencies":{"lodash":"^4.0.0"}}"#);

        let pipeline = Pipeline::new(entry, dir.path(), Recorder::default());
        let plan = pipeline.run().await.unwrap();

        assert!(plan.installed.is_empty());
        assert!(pipeline.installer.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_run_malformed_manifest() {
        let dir = TempDir::new().unwrap();
        let entry = write(dir.path(), "index.js", "require('lodash');\n");
        write(dir.path(), "package.json", "{ nope");

        let pipeline = Pipeline::new(entry, dir.path(), Recorder::default());
        let err = pipeline.run().await.unwrap_err();
        assert!(matches!(err, CycleError::Manifest(_)));
    }

    #[test]
    fn test_prepare_creates_manifest_with_save() {
        let dir = TempDir::new().unwrap();
        let entry = dir.path().join("index.js");

        Pipeline::new(entry.clone(), dir.path(), Recorder::default())
            .prepare()
            .unwrap();
        assert!(!dir.path().join("package.json").exists());

        Pipeline::new(entry, dir.path(), Recorder::default())
            .save(true)
            .prepare()
            .unwrap();
        let content = fs::read_to_string(dir.path().join("package.json")).unwrap();
        assert_eq!(content.trim(), "{}");
    }

    #[test]
    fn test_prepare_keeps_existing_manifest() {
        let dir = TempDir::new().unwrap();
        let manifest = write(dir.path(), "package.json", r#"{"name":"app"}"#);

        Pipeline::new(dir.path().join("index.js"), dir.path(), Recorder::default())
            .save(true)
            .prepare()
            .unwrap();
        assert_eq!(fs::read_to_string(manifest).unwrap(), r#"{"name":"app"}"#);
    }
}
