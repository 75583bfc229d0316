//! External command execution utilities.
//!
//! Provides a Builder-based API for running external programs on the tokio
//! runtime, either with captured output (installer) or with inherited stdio
//! (the supervised script).
//!
//! # Examples
//!
//! ```ignore
//! use crate::utils::exec::Cmd;
//!
//! // Captured output, filtered into the log
//! Cmd::from_slice(&["npm", "install"])
//!     .args(["lodash", "chalk"])
//!     .cwd(root)
//!     .filter(&NPM_FILTER)
//!     .run()
//!     .await?;
//!
//! // Inherited stdio, caller owns the child
//! let child = Cmd::from_slice(&["node"]).arg(script).spawn()?;
//! ```

use crate::{debug, log};
use regex::Regex;
use std::{
    ffi::{OsStr, OsString},
    path::{Path, PathBuf},
    process::{ExitStatus, Output, Stdio},
    sync::OnceLock,
};
use thiserror::Error;
use tokio::process::{Child, Command};

/// Failures while running an external program.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("failed to execute `{program}`")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("command `{program}` failed with {status}\n{detail}")]
    Failed {
        program: String,
        status: ExitStatus,
        detail: String,
    },
}

// ============================================================================
// Builder API
// ============================================================================

/// Command builder for external process execution.
#[derive(Default, Debug, Clone)]
pub struct Cmd {
    program: OsString,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
    filter: Option<&'static FilterRule>,
}

impl Cmd {
    /// Create from a command array (e.g., `["node"]` or `["npm", "install"]`).
    pub fn from_slice<S: AsRef<OsStr>>(cmd: &[S]) -> Self {
        let mut iter = cmd.iter();
        let program = iter
            .next()
            .map(|s| s.as_ref().to_owned())
            .unwrap_or_default();
        let args: Vec<_> = iter.map(|s| s.as_ref().to_owned()).collect();
        Self {
            program,
            args,
            ..Default::default()
        }
    }

    /// Add a single argument.
    pub fn arg<S: AsRef<OsStr>>(mut self, arg: S) -> Self {
        let arg = arg.as_ref();
        if !arg.is_empty() {
            self.args.push(arg.to_owned());
        }
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        for arg in args {
            let arg = arg.as_ref();
            if !arg.is_empty() {
                self.args.push(arg.to_owned());
            }
        }
        self
    }

    /// Set working directory.
    pub fn cwd<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.cwd = Some(dir.as_ref().to_owned());
        self
    }

    /// Set output filter for logging.
    pub fn filter(mut self, filter: &'static FilterRule) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Program name for messages.
    pub fn program_name(&self) -> String {
        self.program.to_string_lossy().to_string()
    }

    /// Arguments as configured so far.
    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }
        cmd
    }

    /// Run to completion with captured output.
    ///
    /// Output lines passing the filter are logged under the program name.
    /// A non-zero exit becomes [`ExecError::Failed`].
    pub async fn run(self) -> Result<Output, ExecError> {
        let name = self.program_name();
        let filter = self.filter.unwrap_or(&EMPTY_FILTER);

        let output = self
            .command()
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| ExecError::Spawn {
                program: name.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ExecError::Failed {
                detail: format_error(&output, filter),
                program: name,
                status: output.status,
            });
        }

        filter.log(&name, String::from_utf8_lossy(&output.stdout).trim());
        filter.log(&name, String::from_utf8_lossy(&output.stderr).trim());
        Ok(output)
    }

    /// Spawn with inherited stdio; the child is killed if its handle is dropped.
    pub fn spawn(self) -> Result<Child, ExecError> {
        let name = self.program_name();
        debug!("exec"; "spawn {} {:?}", name, self.get_args());
        self.command()
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ExecError::Spawn {
                program: name,
                source,
            })
    }
}

// ============================================================================
// Output Filtering
// ============================================================================

/// Filter rule for command output logging.
///
/// Used to reduce noise by skipping known warnings or irrelevant messages.
#[derive(Debug)]
pub struct FilterRule {
    /// Prefixes to skip when logging output.
    pub skip_prefixes: &'static [&'static str],
}

impl FilterRule {
    /// Create a new filter rule.
    pub const fn new(skip_prefixes: &'static [&'static str]) -> Self {
        Self { skip_prefixes }
    }

    /// Check if a line should be skipped.
    fn should_skip(&self, line: &str) -> bool {
        line.is_empty() || self.skip_prefixes.iter().any(|p| line.starts_with(p))
    }

    /// Lines of `output` that pass the filter, ANSI codes removed.
    fn keep(&self, output: &str) -> Vec<String> {
        output
            .lines()
            .map(|line| strip_ansi(line).trim().to_string())
            .filter(|line| !self.should_skip(line))
            .collect()
    }

    /// Log output lines that pass the filter.
    pub fn log(&self, name: &str, output: &str) {
        let lines = self.keep(output);
        if !lines.is_empty() {
            log!(name; "{}", lines.join("\n"));
        }
    }
}

/// Empty filter (no skipping).
pub const EMPTY_FILTER: FilterRule = FilterRule::new(&[]);

/// npm chatter that does not affect the outcome.
pub const NPM_FILTER: FilterRule = FilterRule::new(&[
    "npm notice",
    "npm WARN deprecated",
    "npm warn deprecated",
    "npm fund",
    "run `npm fund`",
    "run `npm audit",
    "To address",
]);

// ============================================================================
// Helpers
// ============================================================================

/// Strip ANSI escape codes from string.
fn strip_ansi(s: &str) -> std::borrow::Cow<'_, str> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\x1b\[[0-9;]*m").unwrap());
    re.replace_all(s, "")
}

/// Error detail for a failed command: filtered stderr, then stdout.
fn format_error(output: &Output, filter: &FilterRule) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);

    let mut lines = filter.keep(&stderr);
    let stdout_lines = filter.keep(&stdout);
    if !stdout_lines.is_empty() {
        lines.push("Stdout:".to_string());
        lines.extend(stdout_lines);
    }
    lines.join("\n")
}

// ============================================================================
// Tests
// ============================================================================
