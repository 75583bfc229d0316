//! Decide which discovered packages need installing.

use indexmap::IndexMap;

use super::environment::{Environment, Installed};
use super::manifest::Manifest;
use super::version::VersionRange;
use crate::graph::{ExternalNames, Resolver};

/// Packages scheduled for one install batch, in discovery order.
///
/// Each name appears once; the value is the declared range to install
/// with, if any.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PendingInstalls {
    entries: IndexMap<String, Option<String>>,
}

impl PendingInstalls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `name`; a name already scheduled keeps its first entry.
    pub fn push(&mut self, name: &str, range: Option<&str>) {
        if !self.entries.contains_key(name) {
            self.entries
                .insert(name.to_string(), range.map(str::to_string));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Installer arguments: `name` or `name@range`.
    pub fn specs(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|(name, range)| match range {
                Some(range) => format!("{name}@{range}"),
                None => name.clone(),
            })
            .collect()
    }
}

/// Compare discovered packages against the manifest and the installed set.
pub fn reconcile(
    externals: &ExternalNames,
    manifest: Option<&Manifest>,
    environment: &dyn Environment,
    resolver: &dyn Resolver,
) -> PendingInstalls {
    let mut pending = PendingInstalls::new();

    for name in externals {
        if resolver.is_builtin(name) {
            continue;
        }

        let version = match environment.installed(name) {
            Installed::Missing => {
                pending.push(name, None);
                continue;
            }
            Installed::Present(version) => version,
        };

        let Some(declared) = manifest.and_then(|m| m.declared(name)) else {
            continue;
        };
        let (Some(range), Some(version)) = (VersionRange::parse(declared), version) else {
            continue;
        };
        if !range.satisfies(&version) {
            pending.push(name, Some(declared));
        }
    }

    pending
}
