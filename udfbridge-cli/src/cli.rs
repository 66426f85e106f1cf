//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// udfbridge -- detection rule translation across SIEM, EDR, and NSM platforms.
///
/// Use `udfbridge <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "udfbridge", version, about, long_about = None)]
pub struct Cli {
    /// Path to a udfbridge.toml configuration file.
    ///
    /// Without it, built-in defaults plus `UDFBRIDGE_*` environment overrides are used.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable colored text.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Translate a detection rule between platforms.
    Translate(TranslateArgs),

    /// Validate a rule against a platform without translating it.
    Validate(ValidateArgs),

    /// Translate a JSON array of requests.
    Batch(BatchArgs),

    /// List registered platforms.
    Platforms,

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- translate ----

#[derive(Args, Debug)]
pub struct TranslateArgs {
    /// Rule file, or `-` for stdin.
    pub input: PathBuf,

    /// Source platform id (e.g. snort, splunk, siem).
    #[arg(long = "from")]
    pub from: String,

    /// Target platform id.
    #[arg(long = "to")]
    pub to: String,

    /// Optimization level (0-3).
    #[arg(long)]
    pub optimization_level: Option<u8>,

    /// Continue with a warning when the intermediate form is malformed.
    #[arg(long)]
    pub no_strict: bool,

    /// Carry source comments into the translated rule.
    #[arg(long)]
    pub preserve_comments: bool,

    /// Translation deadline in seconds.
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Deployed target platform version.
    #[arg(long)]
    pub target_version: Option<String>,

    /// Version of the source platform the rule was written for.
    #[arg(long)]
    pub source_version: Option<String>,
}

// ---- validate ----

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Rule file, or `-` for stdin.
    pub input: PathBuf,

    /// Platform the rule is written for.
    #[arg(long)]
    pub platform: String,
}

// ---- batch ----

#[derive(Args, Debug)]
pub struct BatchArgs {
    /// JSON file holding an array of translation requests.
    pub file: PathBuf,
}

// ---- config ----

/// Manage udfbridge configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, server, engine, metrics, platforms).
        #[arg(long)]
        section: Option<String>,
    },
}
