//! Specifier classification.
//!
//! A specifier is the literal string inside `require("...")` or
//! `import ... from "..."`. Classification is lexical:
//!
//! | Specifier           | Kind                         |
//! |---------------------|------------------------------|
//! | `./util`, `../lib`  | `Local`                      |
//! | `/abs/path.js`      | `Local`                      |
//! | `lodash/fp`         | `External("lodash")`         |
//! | `@scope/pkg/sub`    | `External("@scope/pkg")`     |
//! | `node:fs`           | `External("node:fs")`        |

use std::path::Path;

use crate::utils::path::has_extension;

/// Extensions of non-code files that are never treated as code dependencies.
pub const DATA_EXTENSIONS: &[&str] = &["json", "node"];

/// A classified dependency specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Specifier {
    /// Path to a file of the project, resolved relative to the importer.
    Local(String),
    /// Bare package name; its internals are never walked.
    External(String),
}

impl Specifier {
    pub fn classify(raw: &str) -> Self {
        if raw.starts_with('.') || Path::new(raw).is_absolute() {
            return Self::Local(raw.to_string());
        }
        Self::External(package_name(raw).to_string())
    }
}

/// Bare package name of an external specifier.
///
/// `lodash/fp` → `lodash`, `@scope/pkg/sub` → `@scope/pkg`. Scheme-prefixed
/// names (`node:fs`) are returned unchanged.
pub fn package_name(spec: &str) -> &str {
    if spec.contains(':') {
        return spec;
    }

    let segments = if spec.starts_with('@') { 2 } else { 1 };
    match spec.match_indices('/').nth(segments - 1) {
        Some((idx, _)) => &spec[..idx],
        None => spec,
    }
}

/// Check whether a specifier or path names a data file.
pub fn is_data_file(spec: &str) -> bool {
    has_extension(spec, DATA_EXTENSIONS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_is_local() {
        assert_eq!(Specifier::classify("./util"), Specifier::Local("./util".into()));
        assert_eq!(
            Specifier::classify("../lib/a.js"),
            Specifier::Local("../lib/a.js".into())
        );
        assert_eq!(Specifier::classify("."), Specifier::Local(".".into()));
    }

    #[cfg(unix)]
    #[test]
    fn test_absolute_is_local() {
        assert!(matches!(
            Specifier::classify("/srv/app/index.js"),
            Specifier::Local(_)
        ));
    }

    #[test]
    fn test_bare_is_external() {
        assert_eq!(
            Specifier::classify("lodash"),
            Specifier::External("lodash".into())
        );
        assert_eq!(
            Specifier::classify("lodash/fp/map"),
            Specifier::External("lodash".into())
        );
    }

    #[test]
    fn test_scoped_package_name() {
        assert_eq!(package_name("@babel/core"), "@babel/core");
        assert_eq!(package_name("@babel/core/lib/index"), "@babel/core");
        assert_eq!(package_name("@scope"), "@scope");
    }

    #[test]
    fn test_scheme_prefixed_kept() {
        assert_eq!(
            Specifier::classify("node:fs/promises"),
            Specifier::External("node:fs/promises".into())
        );
    }

    #[test]
    fn test_data_files() {
        assert!(is_data_file("./config.json"));
        assert!(is_data_file("./addon.node"));
        assert!(!is_data_file("./util.js"));
        assert!(!is_data_file("./util"));
    }
}
