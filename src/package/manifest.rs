//! Project manifest (`package.json`) access.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;
use thiserror::Error;

pub const MANIFEST_NAME: &str = "package.json";

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("cannot read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed {}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot create {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Declared dependency ranges of a project.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Manifest {
    dependencies: IndexMap<String, String>,
    dev_dependencies: IndexMap<String, String>,
}

impl Manifest {
    pub fn from_json(path: &Path, content: &str) -> Result<Self, ManifestError> {
        serde_json::from_str(content).map_err(|source| ManifestError::Malformed {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Declared range of `name`; `dependencies` wins over `devDependencies`.
    pub fn declared(&self, name: &str) -> Option<&str> {
        self.dependencies
            .get(name)
            .or_else(|| self.dev_dependencies.get(name))
            .map(String::as_str)
    }
}

/// Source of the project manifest.
pub trait ManifestStore: Send + Sync {
    /// `Ok(None)` when the project has no manifest.
    fn read(&self) -> Result<Option<Manifest>, ManifestError>;

    /// Create an empty manifest document.
    fn write_empty(&self) -> Result<(), ManifestError>;
}

/// `package.json` in the project root.
#[derive(Debug, Clone)]
pub struct PackageJson {
    path: PathBuf,
}

impl PackageJson {
    pub fn new(root: &Path) -> Self {
        Self {
            path: root.join(MANIFEST_NAME),
        }
    }
}

impl ManifestStore for PackageJson {
    fn read(&self) -> Result<Option<Manifest>, ManifestError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ManifestError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        Manifest::from_json(&self.path, &content).map(Some)
    }

    fn write_empty(&self) -> Result<(), ManifestError> {
        std::fs::write(&self.path, "{}\n").map_err(|source| ManifestError::Write {
            path: self.path.clone(),
            source,
        })
    }
}
