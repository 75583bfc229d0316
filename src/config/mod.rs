//! Runner configuration management for `autobahn.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section.rs     # [runtime], [install], [watch]
//! ├── error.rs       # ConfigError
//! ├── util.rs        # upward config search
//! └── mod.rs         # RunnerConfig (this file)
//! ```
//!
//! The config file is optional. Without one every section uses its defaults,
//! and CLI flags are applied on top either way.

mod error;
mod section;
mod util;

pub use error::ConfigError;
pub use section::{InstallConfig, RuntimeConfig, WatchConfig};

use crate::{cli::Cli, log};
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};
use util::find_config_file;

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing autobahn.toml
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Working directory: package.json and node_modules are looked up here
    #[serde(skip)]
    pub root: PathBuf,

    /// Absolute path to the config file, if one was found
    #[serde(skip)]
    pub config_path: Option<PathBuf>,

    /// Interpreter settings
    pub runtime: RuntimeConfig,

    /// Installer settings
    pub install: InstallConfig,

    /// Watch mode settings
    pub watch: WatchConfig,
}

impl RunnerConfig {
    /// Load configuration for this invocation.
    ///
    /// Searches upward from cwd for the config file; a missing file means
    /// defaults. CLI flags are applied last.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let cwd = std::env::current_dir().map_err(|e| ConfigError::Io(PathBuf::from("."), e))?;

        let config_path = find_config_file(&cli.config, &cwd);
        let mut config = match &config_path {
            Some(path) => Self::from_path(path)?,
            None => Self::default(),
        };

        config.root = cwd;
        config.config_path = config_path;
        config.apply_cli(cli);
        config.validate()?;

        Ok(config)
    }

    /// Parse configuration from TOML string
    #[cfg(test)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    /// Print warning about unknown fields.
    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        log!("warning"; "unknown fields in {}, ignoring:", path.display());
        for field in fields {
            eprintln!("- {}", field);
        }
    }

    /// CLI flags can only switch options on.
    fn apply_cli(&mut self, cli: &Cli) {
        crate::logger::set_verbose(cli.verbose);
        self.install.save |= cli.save;
        self.watch.enable |= cli.watch;
    }

    /// Validate commands before any cycle runs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::validate_command("runtime.command", &self.runtime.command)?;
        Self::validate_command("install.command", &self.install.command)?;
        self.validate_watch()
    }

    fn validate_watch(&self) -> Result<(), ConfigError> {
        if self.watch.interval_ms == 0 {
            return Err(ConfigError::Validation(
                "watch.interval_ms must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    fn validate_command(field: &str, command: &[String]) -> Result<(), ConfigError> {
        let Some(program) = command.first() else {
            return Err(ConfigError::Validation(format!("{field} is empty")));
        };

        if which::which(program).is_err() {
            return Err(ConfigError::Validation(format!(
                "{field}: `{program}` not found in PATH"
            )));
        }
        Ok(())
    }

    /// Get the working directory
    pub fn get_root(&self) -> &Path {
        &self.root
    }
}
