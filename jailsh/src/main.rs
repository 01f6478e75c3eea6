//! jailsh - a shell confined to one directory tree.

use anyhow::{Context, Result};
use clap::Parser;
use jailsh::{repl, Config, Shell};
use std::process::ExitCode;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let config = Config::parse();
    init_logging(&config.log_level);

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("jailsh: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

fn run(config: &Config) -> Result<()> {
    let jail = config
        .open_jail()
        .with_context(|| format!("cannot establish jail root {}", config.root.display()))?;
    tracing::info!(max_path_len = jail.max_path_len(), "shell starting");

    let mut shell = Shell::new(jail);
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    repl::run(&mut shell, stdin.lock(), &mut stdout.lock()).context("terminal I/O failed")
}
