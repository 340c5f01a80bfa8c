//! CLI argument definitions.

use std::path::PathBuf;

use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "fieldmap",
    version,
    about = "Resolve intake documents onto form field schemas",
    long_about = "Resolve nested intake documents onto target form schemas.\n\n\
                  Stored exact, pattern and context rules run first, then the\n\
                  built-in vocabulary, then an optional generative fallback."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (default: ./fieldmap.toml when present).
    #[arg(long = "config", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Allow source values to appear in debug logs.
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Resolve a source document and print the populated result.
    Resolve(ResolveArgs),

    /// Print the mapping report without writing anything.
    Report(ReportArgs),

    /// Manage the stored rule catalogue.
    #[command(subcommand)]
    Rules(RulesCommand),
}

#[derive(Args)]
#[command(group(ArgGroup::new("targets").required(true).args(["skeleton", "fields"])))]
pub struct ResolveArgs {
    /// Source document (JSON).
    #[arg(value_name = "SOURCE")]
    pub source: PathBuf,

    /// Target skeleton to populate (JSON object).
    #[arg(long = "skeleton", value_name = "PATH")]
    pub skeleton: Option<PathBuf>,

    /// Form field descriptors (JSON array); prints a flat key/value map.
    #[arg(long = "fields", value_name = "PATH")]
    pub fields: Option<PathBuf>,

    /// Write the result here instead of stdout.
    #[arg(long = "output", short = 'o', value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Skip the generative fallback for this run.
    #[arg(long = "no-ai")]
    pub no_ai: bool,

    /// Print the report as JSON instead of a table.
    #[arg(long = "json")]
    pub json: bool,
}

#[derive(Args)]
pub struct ReportArgs {
    #[arg(value_name = "SOURCE")]
    pub source: PathBuf,

    #[arg(value_name = "SKELETON")]
    pub skeleton: PathBuf,

    #[arg(long = "no-ai")]
    pub no_ai: bool,

    #[arg(long = "json")]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum RulesCommand {
    /// List stored rules.
    List {
        /// Include inactive rules.
        #[arg(long = "all")]
        all: bool,

        #[arg(long = "json")]
        json: bool,
    },

    /// Add or replace rules from a JSON file (one rule or an array).
    Add {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Remove the rule with the given source and target.
    Remove(RuleKeyArgs),

    /// Change confidence and priority of a stored rule.
    Update {
        #[command(flatten)]
        key: RuleKeyArgs,

        #[arg(long = "confidence")]
        confidence: f64,

        #[arg(long = "priority")]
        priority: u32,
    },

    /// Enable or disable a stored rule.
    SetActive {
        #[command(flatten)]
        key: RuleKeyArgs,

        #[arg(value_name = "ACTIVE", action = clap::ArgAction::Set)]
        active: bool,
    },

    /// Install the built-in default catalogue.
    Seed,
}

/// Identifies a rule by its source side and target side.
#[derive(Args)]
pub struct RuleKeyArgs {
    /// Source path, pattern or bucket.
    #[arg(value_name = "SOURCE")]
    pub source: String,

    /// Target field or template.
    #[arg(value_name = "TARGET")]
    pub target: String,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
