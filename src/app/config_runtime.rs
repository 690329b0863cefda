//! Merges built-in defaults, the config file and CLI flags.

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgMatches, CommandFactory, FromArgMatches, parser::ValueSource};
use rangefetch_core::download::constants::{
    ATTEMPT_TIMEOUT_SECS, CONNECT_TIMEOUT_SECS, DEFAULT_BACKOFF_STEP,
};

use crate::app::config::{FileConfig, VerbositySetting};
use crate::cli::Args;

/// Which flags were given explicitly on the command line.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct CliValueSources {
    pub(crate) output_dir: bool,
    pub(crate) chunk_size_mib: bool,
    pub(crate) max_attempts: bool,
    pub(crate) concurrency: bool,
    pub(crate) resume: bool,
    pub(crate) progress_interval_ms: bool,
    pub(crate) verbose: bool,
    pub(crate) quiet: bool,
}

/// Effective settings for one CLI run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TransferConfig {
    pub(crate) output_dir: PathBuf,
    pub(crate) chunk_size_bytes: u64,
    pub(crate) max_attempts: u32,
    pub(crate) backoff_step: Duration,
    pub(crate) progress_interval: Duration,
    pub(crate) connect_timeout: Duration,
    pub(crate) attempt_timeout: Duration,
    pub(crate) concurrency: usize,
    pub(crate) resume: bool,
    pub(crate) verbose: u8,
    pub(crate) quiet: bool,
}

pub(crate) fn parse_cli_with_sources() -> (Args, CliValueSources) {
    let matches = Args::command().get_matches();
    let args = Args::from_arg_matches(&matches).unwrap_or_else(|err| err.exit());
    let sources = value_sources(&matches);
    (args, sources)
}

pub(crate) fn value_sources(matches: &ArgMatches) -> CliValueSources {
    CliValueSources {
        output_dir: is_commandline_value(matches, "output_dir"),
        chunk_size_mib: is_commandline_value(matches, "chunk_size_mib"),
        max_attempts: is_commandline_value(matches, "max_attempts"),
        concurrency: is_commandline_value(matches, "concurrency"),
        resume: is_commandline_value(matches, "resume"),
        progress_interval_ms: is_commandline_value(matches, "progress_interval_ms"),
        verbose: is_commandline_value(matches, "verbose"),
        quiet: is_commandline_value(matches, "quiet"),
    }
}

fn is_commandline_value(matches: &ArgMatches, id: &str) -> bool {
    matches.value_source(id) == Some(ValueSource::CommandLine)
}

/// Builds the effective config: CLI values win when given on the command
/// line, then file values, then the CLI defaults.
pub(crate) fn resolve_transfer_config(
    args: &Args,
    cli_sources: &CliValueSources,
    file_config: Option<&FileConfig>,
) -> TransferConfig {
    let file = file_config.cloned().unwrap_or_default();

    let output_dir = pick(cli_sources.output_dir, &args.output_dir, file.output_dir);
    let chunk_size_mib = pick(cli_sources.chunk_size_mib, &args.chunk_size_mib, file.chunk_size_mib);
    let max_attempts = pick(cli_sources.max_attempts, &args.max_attempts, file.max_attempts);
    let concurrency = pick(cli_sources.concurrency, &args.concurrency, file.concurrency);
    let resume = pick(cli_sources.resume, &args.resume, file.resume);
    let progress_interval_ms = pick(
        cli_sources.progress_interval_ms,
        &args.progress_interval_ms,
        file.progress_interval_ms,
    );

    let (verbose, quiet) = if cli_sources.verbose || cli_sources.quiet {
        (args.verbose, args.quiet)
    } else {
        match file.verbosity {
            Some(VerbositySetting::Default) => (0, false),
            Some(VerbositySetting::Verbose) => (1, false),
            Some(VerbositySetting::Debug) => (2, false),
            Some(VerbositySetting::Quiet) => (0, true),
            None => (args.verbose, args.quiet),
        }
    };

    TransferConfig {
        output_dir,
        chunk_size_bytes: chunk_size_mib.saturating_mul(1024 * 1024),
        max_attempts: u32::from(max_attempts),
        backoff_step: file
            .backoff_step_secs
            .map_or(DEFAULT_BACKOFF_STEP, Duration::from_secs),
        progress_interval: Duration::from_millis(progress_interval_ms),
        connect_timeout: Duration::from_secs(
            file.connect_timeout_secs.unwrap_or(CONNECT_TIMEOUT_SECS),
        ),
        attempt_timeout: Duration::from_secs(
            file.attempt_timeout_secs.unwrap_or(ATTEMPT_TIMEOUT_SECS),
        ),
        concurrency: usize::from(concurrency),
        resume,
        verbose,
        quiet,
    }
}

fn pick<T: Clone>(from_cli: bool, cli_value: &T, file_value: Option<T>) -> T {
    if from_cli {
        return cli_value.clone();
    }
    file_value.unwrap_or_else(|| cli_value.clone())
}

/// Default log level when `RUST_LOG` is unset.
pub(crate) fn resolve_default_log_level(config: &TransferConfig) -> &'static str {
    if config.quiet {
        "error"
    } else {
        match config.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

pub(crate) fn init_tracing(default_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .try_init();
}
