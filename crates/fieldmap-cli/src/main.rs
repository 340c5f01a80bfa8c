//! `fieldmap` command-line tool.

use std::io::{self, IsTerminal};

use clap::{ColorChoice, Parser};
use fieldmap_cli::config::AppConfig;
use fieldmap_cli::logging::{LogConfig, LogFormat, init_logging};
use tracing::error;
use tracing::level_filters::LevelFilter;

mod cli;
mod commands;
mod summary;

use crate::cli::{Cli, Command, LogFormatArg, LogLevelArg};
use crate::commands::{run_report, run_resolve, run_rules};

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }

    let outcome = AppConfig::load(cli.config.as_deref()).and_then(|config| match &cli.command {
        Command::Resolve(args) => run_resolve(&config, args),
        Command::Report(args) => run_report(&config, args),
        Command::Rules(command) => run_rules(&config, command),
    });
    let exit_code = match outcome {
        Ok(()) => 0,
        Err(err) => {
            error!(error = %err, "command failed");
            eprintln!("error: {err:#}");
            1
        }
    };
    std::process::exit(exit_code);
}

/// Explicit `--log-level` beats `-v`/`-q`, which beat `RUST_LOG`.
fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let mut config = LogConfig {
        level_filter: cli.verbosity.tracing_level_filter(),
        use_env_filter: !(cli.verbosity.is_present() || cli.log_level.is_some()),
        log_file: cli.log_file.clone(),
        log_data: cli.log_data,
        ..LogConfig::default()
    };
    if let Some(level) = cli.log_level {
        config.level_filter = match level {
            LogLevelArg::Error => LevelFilter::ERROR,
            LogLevelArg::Warn => LevelFilter::WARN,
            LogLevelArg::Info => LevelFilter::INFO,
            LogLevelArg::Debug => LevelFilter::DEBUG,
            LogLevelArg::Trace => LevelFilter::TRACE,
        };
    }
    config.format = match cli.log_format {
        LogFormatArg::Pretty => LogFormat::Pretty,
        LogFormatArg::Compact => LogFormat::Compact,
        LogFormatArg::Json => LogFormat::Json,
    };
    config.with_ansi = match cli.color.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => cli.log_file.is_none() && io::stderr().is_terminal(),
    };
    config
}
