//! Progress UI (indicatif bar) fed by throttled transfer samples.

use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use rangefetch_core::{ProgressSample, ProgressSink, format_size};
use tracing::info;

/// Files at least this large (advisory size) get a progress bar.
pub(crate) const PROGRESS_BAR_THRESHOLD: u64 = 50 * 1024 * 1024;

/// Whether a file of `advisory_size` bytes should show a bar.
pub(crate) fn should_show_bar(advisory_size: u64, quiet: bool) -> bool {
    !quiet && advisory_size >= PROGRESS_BAR_THRESHOLD
}

/// Renders progress samples on an indicatif bar.
pub(crate) struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub(crate) fn new(label: &str) -> Self {
        Self::with_target(label, ProgressDrawTarget::stderr())
    }

    pub(crate) fn with_target(label: &str, target: ProgressDrawTarget) -> Self {
        let bar = ProgressBar::with_draw_target(None, target);
        bar.set_style(
            ProgressStyle::with_template(
                "{msg} [{bar:30}] {bytes}/{total_bytes} {bytes_per_sec} eta {eta}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
        );
        bar.set_message(label.to_string());
        Self { bar }
    }

    /// Clears the bar once the transfer has ended.
    pub(crate) fn finish(&self) {
        self.bar.finish_and_clear();
    }

    #[cfg(test)]
    fn position(&self) -> u64 {
        self.bar.position()
    }
}

#[async_trait]
impl ProgressSink for BarProgress {
    async fn on_progress(&self, sample: &ProgressSample) {
        self.bar.set_length(sample.total_bytes);
        self.bar.set_position(sample.bytes_transferred);
    }
}

/// Logs progress samples at info level (no bar).
pub(crate) struct LogProgress {
    label: String,
}

impl LogProgress {
    pub(crate) fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
        }
    }
}

#[async_trait]
impl ProgressSink for LogProgress {
    async fn on_progress(&self, sample: &ProgressSample) {
        let percent = sample.fraction() * 100.0;
        info!(
            file = %self.label,
            done = %format_size(sample.bytes_transferred),
            total = %format_size(sample.total_bytes),
            percent = format_args!("{percent:.1}"),
            eta_secs = sample.eta.map(|eta| eta.as_secs()),
            "progress"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn sample(bytes: u64, total: u64) -> ProgressSample {
        ProgressSample {
            bytes_transferred: bytes,
            total_bytes: total,
            bytes_per_second: 0.0,
            eta: None,
            elapsed: Duration::ZERO,
        }
    }

    #[test]
    fn test_should_show_bar_threshold() {
        assert!(!should_show_bar(PROGRESS_BAR_THRESHOLD - 1, false));
        assert!(should_show_bar(PROGRESS_BAR_THRESHOLD, false));
        assert!(!should_show_bar(PROGRESS_BAR_THRESHOLD * 4, true));
    }

    #[tokio::test]
    async fn test_bar_tracks_samples() {
        let progress = BarProgress::with_target("file.bin", ProgressDrawTarget::hidden());
        progress.on_progress(&sample(10, 100)).await;
        assert_eq!(progress.position(), 10);
        progress.on_progress(&sample(100, 100)).await;
        assert_eq!(progress.position(), 100);
        progress.finish();
    }

    #[tokio::test]
    async fn test_log_progress_accepts_samples() {
        let progress = LogProgress::new("file.bin");
        progress.on_progress(&sample(0, 0)).await;
        progress.on_progress(&sample(5, 10)).await;
    }
}
