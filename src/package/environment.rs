//! Installed-package lookup.

use std::path::{Path, PathBuf};

use semver::Version;
use serde::Deserialize;

use super::manifest::MANIFEST_NAME;
use crate::graph::{NodeResolver, Resolver};

/// Installation state of a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Installed {
    Missing,
    /// Installed; `None` when its own version is absent or not semver.
    Present(Option<Version>),
}

/// Answers which packages are available to the script.
pub trait Environment: Send + Sync {
    fn installed(&self, name: &str) -> Installed;
}

/// `node_modules` directories visible from the project root.
#[derive(Debug, Clone)]
pub struct NodeModules {
    root: PathBuf,
    resolver: NodeResolver,
}

#[derive(Deserialize)]
struct PackageVersion {
    version: Option<String>,
}

impl NodeModules {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            resolver: NodeResolver::new(),
        }
    }
}

impl Environment for NodeModules {
    fn installed(&self, name: &str) -> Installed {
        match self.resolver.package_dir(name, &self.root) {
            Some(dir) => Installed::Present(read_version(&dir.join(MANIFEST_NAME))),
            None => Installed::Missing,
        }
    }
}

fn read_version(path: &Path) -> Option<Version> {
    let content = std::fs::read_to_string(path).ok()?;
    let version = serde_json::from_str::<PackageVersion>(&content).ok()?.version?;
    Version::parse(version.trim()).ok()
}
