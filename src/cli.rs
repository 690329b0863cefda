//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

/// Default chunk size in MiB (matches the library default of 10 MiB).
pub(crate) const DEFAULT_CHUNK_SIZE_MIB: u64 = 10;

/// Default attempts per range.
pub(crate) const DEFAULT_MAX_ATTEMPTS: u8 = 5;

/// Default progress interval in milliseconds.
pub(crate) const DEFAULT_PROGRESS_INTERVAL_MS: u64 = 1500;

/// Resumable chunked downloads of direct links.
///
/// Each file is fetched in fixed-size byte ranges with independent retry and
/// written in order to the output directory.
#[derive(Parser, Debug, Clone)]
#[command(name = "rangefetch")]
#[command(author, version, about)]
pub struct Args {
    /// URLs to download (reads URLs from stdin text when omitted)
    pub urls: Vec<String>,

    /// JSON file of resolved files: [{"name", "size", "url", "thumbnailUrl"}]
    #[arg(short = 'm', long, conflicts_with = "urls")]
    pub manifest: Option<PathBuf>,

    /// Output directory
    #[arg(short = 'o', long, default_value = "./downloads")]
    pub output_dir: PathBuf,

    /// Config file (defaults to $XDG_CONFIG_HOME/rangefetch/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Extra request header as "Name: Value" (repeatable)
    #[arg(short = 'H', long = "header", value_name = "NAME: VALUE")]
    pub headers: Vec<String>,

    /// User-Agent header value
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Referer header value
    #[arg(long)]
    pub referer: Option<String>,

    /// Cookie header value
    #[arg(long)]
    pub cookie: Option<String>,

    /// Range size in MiB (1-1024)
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE_MIB, value_parser = clap::value_parser!(u64).range(1..=1024))]
    pub chunk_size_mib: u64,

    /// Attempts per range, including the first (1-10)
    #[arg(short = 'r', long, default_value_t = DEFAULT_MAX_ATTEMPTS, value_parser = clap::value_parser!(u8).range(1..=10))]
    pub max_attempts: u8,

    /// Range fetches kept in flight per file (1-16)
    #[arg(short = 'c', long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=16))]
    pub concurrency: u8,

    /// Keep committed chunks from an interrupted run and continue after them
    #[arg(long)]
    pub resume: bool,

    /// Minimum milliseconds between progress updates (100-60000)
    #[arg(long, default_value_t = DEFAULT_PROGRESS_INTERVAL_MS, value_parser = clap::value_parser!(u64).range(100..=60000))]
    pub progress_interval_ms: u64,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default_args_parses_successfully() {
        let args = Args::try_parse_from(["rangefetch"]).unwrap();
        assert!(args.urls.is_empty());
        assert_eq!(args.output_dir, PathBuf::from("./downloads"));
        assert_eq!(args.chunk_size_mib, 10);
        assert_eq!(args.max_attempts, 5);
        assert_eq!(args.concurrency, 1);
        assert_eq!(args.progress_interval_ms, 1500);
        assert!(!args.resume);
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
    }

    #[test]
    fn test_cli_positional_urls() {
        let args =
            Args::try_parse_from(["rangefetch", "https://a.example/1", "https://b.example/2"])
                .unwrap();
        assert_eq!(args.urls.len(), 2);
    }

    #[test]
    fn test_cli_repeatable_headers() {
        let args = Args::try_parse_from([
            "rangefetch",
            "-H",
            "Authorization: Bearer x",
            "--header",
            "X-Trace: 1",
        ])
        .unwrap();
        assert_eq!(args.headers, vec!["Authorization: Bearer x", "X-Trace: 1"]);
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let args = Args::try_parse_from(["rangefetch", "-vv"]).unwrap();
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_cli_manifest_conflicts_with_urls() {
        let result = Args::try_parse_from(["rangefetch", "-m", "files.json", "https://a.example/1"]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::ArgumentConflict
        );
    }

    #[test]
    fn test_cli_concurrency_over_max_rejected() {
        let result = Args::try_parse_from(["rangefetch", "-c", "17"]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::ValueValidation
        );
    }

    #[test]
    fn test_cli_max_attempts_zero_rejected() {
        let result = Args::try_parse_from(["rangefetch", "-r", "0"]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::ValueValidation
        );
    }

    #[test]
    fn test_cli_chunk_size_zero_rejected() {
        let result = Args::try_parse_from(["rangefetch", "--chunk-size-mib", "0"]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::ValueValidation
        );
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let result = Args::try_parse_from(["rangefetch", "--help"]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::DisplayHelp
        );
    }
}
