//! Configuration sections.
//!
//! # Example
//!
//! ```toml
//! [runtime]
//! command = ["node", "--enable-source-maps"]
//!
//! [install]
//! command = ["npm", "install"]
//! save = false
//!
//! [watch]
//! enable = false
//! interval_ms = 500
//! ```

use std::time::Duration;

use serde::Deserialize;

/// `[runtime]` - interpreter used to run the script.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Interpreter program followed by its own leading arguments.
    pub command: Vec<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            command: vec!["node".into()],
        }
    }
}

/// `[install]` - package installer invocation.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InstallConfig {
    /// Installer program and subcommand; package specs are appended.
    pub command: Vec<String>,

    /// Persist installed packages to package.json.
    pub save: bool,
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            command: vec!["npm".into(), "install".into()],
            save: false,
        }
    }
}

/// `[watch]` - restart on file changes.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Enable the watch/restart loop.
    pub enable: bool,

    /// Polling interval for watched files, in milliseconds.
    pub interval_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            enable: false,
            interval_ms: 500,
        }
    }
}

impl WatchConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}
