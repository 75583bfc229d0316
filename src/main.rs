//! Autobahn - run a node script and get its missing dependencies installed.

mod cli;
mod config;
mod core;
mod graph;
mod logger;
mod package;
mod supervisor;
mod utils;

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ColorChoice, CommandFactory, Parser};
use cli::Cli;
use config::RunnerConfig;
use package::NpmInstaller;
use supervisor::{NodeLauncher, Pipeline, PollWatchSet, RunMode, Supervisor};
use utils::path::normalize_path;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }

    let Some(script) = cli.script() else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let config = RunnerConfig::load(&cli)?;
    if let Some(path) = &config.config_path {
        debug!("autobahn"; "using {}", path.display());
    }

    // Setup global Ctrl+C handler (before the script is started)
    core::setup_shutdown_handler()?;

    let script = normalize_path(script, config.get_root());
    let code = run(&cli, &config, script)?;
    std::process::exit(code);
}

/// Drive the supervisor to completion and return the exit code to mirror.
fn run(cli: &Cli, config: &RunnerConfig, script: PathBuf) -> Result<i32> {
    let root = config.get_root();
    let mode = if config.watch.enable {
        RunMode::Watch
    } else {
        RunMode::Once
    };

    let launcher = NodeLauncher::new(runtime_command(config, &script, cli.script_args()), root);
    let installer = NpmInstaller::new(&config.install.command, root);
    let pipeline = Pipeline::new(script, root, installer).save(config.install.save);
    let watch = PollWatchSet::new(config.watch.interval());
    let supervisor = Supervisor::new(pipeline, launcher, watch, core::shutdown_signal());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    let code = runtime.block_on(supervisor.run(mode))?;
    Ok(code)
}

/// `<runtime command...> <absolute script> <script arguments...>`
fn runtime_command(config: &RunnerConfig, script: &Path, args: &[OsString]) -> Vec<OsString> {
    config
        .runtime
        .command
        .iter()
        .map(OsString::from)
        .chain(std::iter::once(script.as_os_str().to_owned()))
        .chain(args.iter().cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_command() {
        let mut config = RunnerConfig::default();
        config.runtime.command = vec!["node".into(), "--enable-source-maps".into()];

        let args = [OsString::from("--port"), OsString::from(""), OsString::from("-v")];
        let command = runtime_command(&config, Path::new("/app/index.js"), &args);

        assert_eq!(
            command,
            ["node", "--enable-source-maps", "/app/index.js", "--port", "", "-v"]
                .map(OsString::from)
                .to_vec()
        );
    }
}
