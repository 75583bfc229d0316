//! Module resolution with Node semantics.
//!
//! Resolution order for a local specifier `./foo` relative to `base`:
//!
//! ```text
//! base/foo                  exact file
//! base/foo.{js,mjs,...}     extension probing
//! base/foo/package.json     "main" field (exact, probed, or main/index.*)
//! base/foo/index.*          directory index
//! ```
//!
//! Bare specifiers are looked up in `node_modules` of `base` and each
//! ancestor, nearest first.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use super::builtin::is_node_builtin;
use super::specifier::package_name;

/// Extensions probed when a specifier names no existing file.
///
/// Node's own `.js`, `.json`, `.node` come first, then the dialects.
pub const RESOLVE_EXTENSIONS: &[&str] = &["js", "json", "node", "mjs", "cjs", "ts", "tsx", "jsx"];

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("cannot resolve `{specifier}` from {}", base.display())]
    NotFound { specifier: String, base: PathBuf },

    #[error("cannot read {}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Maps a specifier to a file on disk.
pub trait Resolver: Send + Sync {
    /// Canonical path of the file `specifier` refers to, relative to `base`.
    fn resolve(&self, specifier: &str, base: &Path) -> Result<PathBuf, ResolveError>;

    /// Modules provided by the interpreter itself.
    fn is_builtin(&self, name: &str) -> bool;

    /// Installed root directory of package `name`, searched from `base` upward.
    fn package_dir(&self, name: &str, base: &Path) -> Option<PathBuf>;
}

/// File-system resolver following Node's CommonJS rules.
#[derive(Debug, Clone)]
pub struct NodeResolver {
    extensions: &'static [&'static str],
}

impl Default for NodeResolver {
    fn default() -> Self {
        Self {
            extensions: RESOLVE_EXTENSIONS,
        }
    }
}

#[derive(Deserialize)]
struct PackageMain {
    main: Option<String>,
}

impl NodeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    fn resolve_path(&self, base: &Path) -> Option<PathBuf> {
        if base.is_file() {
            return Some(canonical(base));
        }
        if let Some(found) = self.probe(base) {
            return Some(found);
        }
        if base.is_dir() {
            return self.resolve_directory(base);
        }
        None
    }

    /// `path.<ext>` for each known extension, appended rather than replaced.
    fn probe(&self, path: &Path) -> Option<PathBuf> {
        self.extensions.iter().find_map(|ext| {
            let mut candidate = path.as_os_str().to_owned();
            candidate.push(".");
            candidate.push(ext);
            let candidate = PathBuf::from(candidate);
            candidate.is_file().then(|| canonical(&candidate))
        })
    }

    fn resolve_directory(&self, dir: &Path) -> Option<PathBuf> {
        if let Some(main) = read_main(&dir.join("package.json")) {
            let main_path = dir.join(main);
            if main_path.is_file() {
                return Some(canonical(&main_path));
            }
            if let Some(found) = self.probe(&main_path) {
                return Some(found);
            }
            if main_path.is_dir()
                && let Some(found) = self.probe(&main_path.join("index"))
            {
                return Some(found);
            }
        }
        self.probe(&dir.join("index"))
    }

    fn resolve_bare(&self, specifier: &str, base: &Path) -> Option<PathBuf> {
        let name = package_name(specifier);
        let subpath = specifier[name.len()..].trim_start_matches('/');

        base.ancestors().find_map(|dir| {
            let pkg_dir = dir.join("node_modules").join(name);
            if !pkg_dir.is_dir() {
                return None;
            }
            if subpath.is_empty() {
                self.resolve_path(&pkg_dir)
            } else {
                self.resolve_path(&pkg_dir.join(subpath))
            }
        })
    }
}

impl Resolver for NodeResolver {
    fn resolve(&self, specifier: &str, base: &Path) -> Result<PathBuf, ResolveError> {
        let target = Path::new(specifier);
        let found = if specifier.starts_with('.') || target.is_absolute() {
            self.resolve_path(&base.join(target))
        } else {
            self.resolve_bare(specifier, base)
        };

        found.ok_or_else(|| ResolveError::NotFound {
            specifier: specifier.to_string(),
            base: base.to_path_buf(),
        })
    }

    fn is_builtin(&self, name: &str) -> bool {
        is_node_builtin(name)
    }

    fn package_dir(&self, name: &str, base: &Path) -> Option<PathBuf> {
        base.ancestors().find_map(|dir| {
            let pkg_dir = dir.join("node_modules").join(name);
            let installed = pkg_dir.join("package.json").is_file()
                || self.probe(&pkg_dir.join("index")).is_some();
            installed.then(|| canonical(&pkg_dir))
        })
    }
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// `main` field of a package.json; missing or malformed files yield `None`.
fn read_main(path: &Path) -> Option<String> {
    let content = std::fs::read_to_string(path).ok()?;
    serde_json::from_str::<PackageMain>(&content).ok()?.main
}
