//! Dependency graph walker.
//!
//! Starting from the entry script, follows local specifiers file by file and
//! collects every bare package name it meets. Package internals are never
//! entered.

use std::path::{Path, PathBuf};

use indexmap::IndexSet;
use thiserror::Error;

use super::extract::{ParseError, extract_imports};
use super::resolve::{ResolveError, Resolver};
use super::specifier::{Specifier, is_data_file};
use crate::debug;
use crate::utils::path::parent_dir;

/// Canonical paths of every local file reached, in discovery order.
pub type VisitedSet = IndexSet<PathBuf>;

/// Bare package names, in discovery order.
pub type ExternalNames = IndexSet<String>;

#[derive(Debug, Error)]
pub enum WalkError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

/// Result of a complete walk.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Discovery {
    pub visited: VisitedSet,
    pub externals: ExternalNames,
}

/// Walk the import graph rooted at `entry`.
///
/// A file's package names are recorded as soon as the file is read; its
/// local imports are then walked depth-first in the order they appear.
/// Any parse or resolution failure aborts the walk.
pub async fn walk(resolver: &dyn Resolver, entry: &Path) -> Result<Discovery, WalkError> {
    let entry = entry.canonicalize().map_err(|source| ResolveError::Unreadable {
        path: entry.to_path_buf(),
        source,
    })?;

    let mut discovery = Discovery::default();
    let mut stack = vec![entry];

    while let Some(file) = stack.pop() {
        if !discovery.visited.insert(file.clone()) {
            continue;
        }

        let name = file.to_string_lossy();
        if is_data_file(&name) {
            continue;
        }

        let source = tokio::fs::read_to_string(&file)
            .await
            .map_err(|source| ResolveError::Unreadable {
                path: file.clone(),
                source,
            })?;

        let base = parent_dir(&file);
        let mut children = Vec::new();
        for raw in extract_imports(&file, &source)? {
            match Specifier::classify(&raw) {
                Specifier::Local(spec) => children.push(resolver.resolve(&spec, &base)?),
                Specifier::External(pkg) => {
                    discovery.externals.insert(pkg);
                }
            }
        }

        debug!("walk"; "{}: {} local import(s)", file.display(), children.len());
        stack.extend(children.into_iter().rev());
    }

    Ok(discovery)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeResolver;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) -> PathBuf {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    fn names(discovery: &Discovery) -> Vec<&str> {
        discovery.externals.iter().map(String::as_str).collect()
    }

    fn file_names(discovery: &Discovery) -> Vec<String> {
        discovery
            .visited
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_discovery_order() {
        let dir = TempDir::new().unwrap();
        let entry = write(
            dir.path(),
            "index.js",
            "require('./util');\nrequire('lodash');\n",
        );
        write(dir.path(), "util.js", "module.exports = require('chalk');\n");

        let discovery = walk(&NodeResolver::new(), &entry).await.unwrap();
        assert_eq!(names(&discovery), vec!["lodash", "chalk"]);
        assert_eq!(file_names(&discovery), vec!["index.js", "util.js"]);
    }

    #[tokio::test]
    async fn test_depth_first_declared_order() {
        let dir = TempDir::new().unwrap();
        let entry = write(dir.path(), "index.js", "require('./a');\nrequire('./b');\n");
        write(dir.path(), "a.js", "require('./c');\n");
        write(dir.path(), "b.js", "");
        write(dir.path(), "c.js", "");

        let discovery = walk(&NodeResolver::new(), &entry).await.unwrap();
        assert_eq!(file_names(&discovery), vec!["index.js", "a.js", "c.js", "b.js"]);
    }

    #[tokio::test]
    async fn test_cycle_visits_each_file_once() {
        let dir = TempDir::new().unwrap();
        let a = write(dir.path(), "a.js", "require('./b');\nrequire('x');\n");
        write(dir.path(), "b.js", "require('./a');\nrequire('y');\n");

        let discovery = walk(&NodeResolver::new(), &a).await.unwrap();
        assert_eq!(file_names(&discovery), vec!["a.js", "b.js"]);
        assert_eq!(names(&discovery), vec!["x", "y"]);
    }

    #[tokio::test]
    async fn test_diamond_and_self_import() {
        let dir = TempDir::new().unwrap();
        let entry = write(
            dir.path(),
            "index.js",
            "require('./index');\nrequire('./a');\nrequire('./b');\n",
        );
        write(dir.path(), "a.js", "require('./shared');\n");
        write(dir.path(), "b.js", "require('./shared');\n");
        write(dir.path(), "shared.js", "require('lodash/fp');\n");

        let discovery = walk(&NodeResolver::new(), &entry).await.unwrap();
        assert_eq!(discovery.visited.len(), 4);
        assert_eq!(names(&discovery), vec!["lodash"]);
    }

    #[tokio::test]
    async fn test_walk_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let entry = write(dir.path(), "index.mjs", "import './lib/index.mjs';\nimport 'chalk';\n");
        write(dir.path(), "lib/index.mjs", "export * from 'ora';\n");

        let resolver = NodeResolver::new();
        let first = walk(&resolver, &entry).await.unwrap();
        let second = walk(&resolver, &entry).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_builtins_recorded() {
        let dir = TempDir::new().unwrap();
        let entry = write(dir.path(), "index.js", "require('fs');\nrequire('node:path');\n");

        let discovery = walk(&NodeResolver::new(), &entry).await.unwrap();
        assert_eq!(names(&discovery), vec!["fs", "node:path"]);
    }

    #[tokio::test]
    async fn test_data_file_visited_not_parsed() {
        let dir = TempDir::new().unwrap();
        let entry = write(dir.path(), "index.js", "require('./config');\n");
        write(dir.path(), "config.json", "{ \"require('x')\": 1 }");

        let discovery = walk(&NodeResolver::new(), &entry).await.unwrap();
        assert_eq!(file_names(&discovery), vec!["index.js", "config.json"]);
        assert!(discovery.externals.is_empty());
    }

    #[tokio::test]
    async fn test_unresolvable_local_aborts() {
        let dir = TempDir::new().unwrap();
        let entry = write(dir.path(), "index.js", "require('lodash');\nrequire('./gone');\n");

        let err = walk(&NodeResolver::new(), &entry).await.unwrap_err();
        assert!(matches!(err, WalkError::Resolve(ResolveError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_parse_error_aborts() {
        let dir = TempDir::new().unwrap();
        let entry = write(dir.path(), "index.js", "require('./bad');\n");
        write(dir.path(), "bad.js", "function (\n");

        let err = walk(&NodeResolver::new(), &entry).await.unwrap_err();
        match err {
            WalkError::Parse(parse) => assert!(parse.path.ends_with("bad.js")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_missing_entry() {
        let dir = TempDir::new().unwrap();
        let err = walk(&NodeResolver::new(), &dir.path().join("nope.js"))
            .await
            .unwrap_err();
        assert!(matches!(err, WalkError::Resolve(ResolveError::Unreadable { .. })));
    }
}
