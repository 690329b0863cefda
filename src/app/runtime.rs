use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use rangefetch_core::download::filename;
use rangefetch_core::{
    ChunkedTransfer, HttpClient, ProgressSink, ResolvedFile, RetryPolicy, TransferError,
    TransferOptions, TransferReport, TransferRequest, format_size,
};
use reqwest::header::HeaderMap;
use tracing::{debug, info, warn};

use crate::ProcessExit;
use crate::app::config_runtime::TransferConfig;
use crate::app::progress_manager::{BarProgress, LogProgress, should_show_bar};
use crate::app::{config, config_runtime, exit_handler, input_processor};

pub(crate) async fn run_rangefetch() -> Result<ProcessExit> {
    let (cli, cli_sources) = config_runtime::parse_cli_with_sources();

    let file_config = config::load_file_config(cli.config.as_deref())?;
    let settings = config_runtime::resolve_transfer_config(&cli, &cli_sources, file_config.as_ref());

    config_runtime::init_tracing(config_runtime::resolve_default_log_level(&settings));
    debug!(?settings, "effective configuration");

    let files = input_processor::collect_files(&cli)?;
    if files.is_empty() {
        info!("No input provided. Pass URLs as arguments, pipe text via stdin or use --manifest.");
        return Ok(ProcessExit::Success);
    }
    let headers = input_processor::build_headers(&cli)?;

    let client = HttpClient::with_timeouts(settings.connect_timeout, settings.attempt_timeout)
        .context("Failed to build HTTP client")?;
    let options = TransferOptions {
        progress_interval: settings.progress_interval,
        concurrency: settings.concurrency,
        resume: settings.resume,
    };

    let interrupted = Arc::new(AtomicBool::new(false));
    let interrupted_signal = Arc::clone(&interrupted);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupted_signal.store(true, Ordering::SeqCst);
        }
    });

    let engine = ChunkedTransfer::new(
        client,
        RetryPolicy::new(settings.max_attempts, settings.backoff_step),
        options,
    )?
    .with_interrupt_flag(Arc::clone(&interrupted));

    info!(files = files.len(), output_dir = %settings.output_dir.display(), "rangefetch starting");

    let mut completed = 0_usize;
    let mut failed = 0_usize;
    for file in &files {
        if interrupted.load(Ordering::SeqCst) {
            break;
        }
        match transfer_file(&engine, file, &headers, &settings).await {
            Ok(report) => {
                completed += 1;
                if !settings.quiet {
                    println!(
                        "Saved {} ({})",
                        report.destination.display(),
                        format_size(report.total_bytes)
                    );
                }
            }
            Err(error) => {
                failed += 1;
                eprintln!("[{}] {}", error.kind(), error.human_message());
            }
        }
    }

    info!(completed, failed, total = files.len(), "rangefetch finished");

    if interrupted.load(Ordering::SeqCst) {
        warn!(
            completed,
            total = files.len(),
            "Interrupted. Run again with --resume to continue."
        );
        return Ok(ProcessExit::Failure);
    }

    Ok(exit_handler::determine_exit_outcome(completed, failed))
}

async fn transfer_file(
    engine: &ChunkedTransfer,
    file: &ResolvedFile,
    headers: &HeaderMap,
    settings: &TransferConfig,
) -> Result<TransferReport, TransferError> {
    let destination = filename::destination_path(
        &settings.output_dir,
        file.preferred_name(),
        &file.download_url,
    );
    let label = destination
        .file_name()
        .map_or_else(|| file.download_url.clone(), |name| name.to_string_lossy().into_owned());

    let request = TransferRequest::new(&file.download_url, destination)
        .with_headers(headers.clone())
        .with_chunk_size(settings.chunk_size_bytes);

    if should_show_bar(file.size, settings.quiet) {
        let bar = BarProgress::new(&label);
        let outcome = engine.run(&request, &bar).await;
        bar.finish();
        outcome
    } else {
        let progress: &dyn ProgressSink = &LogProgress::new(&label);
        engine.run(&request, progress).await
    }
}
