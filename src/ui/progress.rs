//! Download progress with CI fallback

use super::context::UiContext;
use crate::artifact::ProgressSink;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Byte progress bar on stderr; silent when nobody is watching
pub struct DownloadProgress {
    bar: Option<ProgressBar>,
}

impl DownloadProgress {
    pub fn new(ctx: &UiContext) -> Self {
        let bar = ctx.use_fancy_output().then(|| {
            let bar = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
            bar.set_style(download_style());
            bar
        });
        Self { bar }
    }
}

fn download_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("  {spinner:.cyan} Downloading  {bar:20.cyan/dim} {bytes}/{total_bytes} {bytes_per_sec:.dim}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("━╸─")
}

impl ProgressSink for DownloadProgress {
    fn started(&self, total: Option<u64>) {
        if let Some(ref bar) = self.bar {
            if let Some(total) = total {
                bar.set_length(total);
            }
            bar.enable_steady_tick(std::time::Duration::from_millis(120));
        }
    }

    fn advanced(&self, written: u64) {
        if let Some(ref bar) = self.bar {
            bar.set_position(written);
        }
    }

    fn finished(&self) {
        if let Some(ref bar) = self.bar {
            bar.disable_steady_tick();
            bar.finish_and_clear();
        }
    }
}
