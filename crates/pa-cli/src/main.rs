use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use pa_cli::commands::{self, check, errors, record, replay};
use pa_cli::{Cli, Commands, Config};

fn load_config(config_path: Option<&Path>) -> Result<Config> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");
    Ok(config)
}

const fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // try_init: tests may have installed a subscriber already
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    let code = match &cli.command {
        Some(Commands::Errors { json }) => {
            errors::run(&mut out, *json)?;
            ExitCode::SUCCESS
        }
        Some(Commands::Check) => {
            let config = load_config(cli.config.as_deref())?;
            let status = check::run(&mut out, &config)?;
            exit_code(status.is_success())
        }
        Some(Commands::Record { event }) => {
            let config = load_config(cli.config.as_deref())?;
            let recorder = commands::configured_recorder(&config)?;
            let status = record::run(&mut out, &recorder, event, config.timeout())?;
            exit_code(status.is_success())
        }
        Some(Commands::Replay { dry_run }) => {
            let config = load_config(cli.config.as_deref())?;
            let stdin = io::stdin();
            let summary = replay::run(stdin.lock(), &mut out, &config, *dry_run)?;
            exit_code(summary.failed == 0)
        }
        None => {
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
            ExitCode::SUCCESS
        }
    };

    out.flush()?;
    Ok(code)
}
