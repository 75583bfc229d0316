//! Command-line interface definitions.

use clap::{ColorChoice, Parser};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Run a node script and get its missing dependencies installed automatically
#[derive(Parser, Debug, Clone)]
#[command(
    version,
    about,
    long_about = None,
    override_usage = "autobahn [OPTIONS] <SCRIPT> [ARGUMENTS]..."
)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, default_value = "auto")]
    pub color: ColorChoice,

    /// Save installed dependencies to package.json
    #[arg(short, long)]
    pub save: bool,

    /// Watch the required files and restart when a file changes
    #[arg(short, long)]
    pub watch: bool,

    /// Enable verbose output for debugging
    #[arg(short, long)]
    pub verbose: bool,

    /// Config file path (default: autobahn.toml, searched upward)
    #[arg(short = 'C', long, default_value = "autobahn.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Script to run, followed by the arguments passed to it
    #[arg(
        value_name = "SCRIPT",
        trailing_var_arg = true,
        allow_hyphen_values = true,
        value_hint = clap::ValueHint::FilePath
    )]
    pub command: Vec<OsString>,
}

impl Cli {
    /// Entry script as given on the command line.
    pub fn script(&self) -> Option<&Path> {
        self.command.first().map(Path::new)
    }

    /// Arguments forwarded to the script untouched.
    pub fn script_args(&self) -> &[OsString] {
        self.command.get(1..).unwrap_or_default()
    }
}
