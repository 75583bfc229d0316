//! Configuration utility functions.

use std::path::{Path, PathBuf};

/// Find config file by searching upward from `start`
///
/// Walks up parent directories until finding `config_name`.
/// Returns the absolute path to the config file if found.
///
/// # Example
/// ```text
/// /home/user/app/src/        ← start
/// /home/user/app/autobahn.toml  ← found!
/// ```
pub fn find_config_file(config_name: &Path, start: &Path) -> Option<PathBuf> {
    if config_name.is_absolute() {
        return config_name.exists().then(|| config_name.to_path_buf());
    }

    let mut current = start;
    loop {
        let candidate = current.join(config_name);
        if candidate.is_file() {
            return Some(candidate);
        }

        match current.parent() {
            Some(parent) => current = parent,
            None => return None,
        }
    }
}

// ============================================================================
// tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_find_config_in_start_dir() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("autobahn.toml");
        std::fs::write(&config, "").unwrap();

        let found = find_config_file(Path::new("autobahn.toml"), dir.path());
        assert_eq!(found, Some(config));
    }

    #[test]
    fn test_find_config_in_ancestor() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("autobahn.toml");
        std::fs::write(&config, "").unwrap();
        let nested = dir.path().join("src/routes");
        std::fs::create_dir_all(&nested).unwrap();

        let found = find_config_file(Path::new("autobahn.toml"), &nested);
        assert_eq!(found, Some(config));
    }

    #[test]
    fn test_find_config_absolute_missing() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(find_config_file(&missing, dir.path()).is_none());
    }
}
