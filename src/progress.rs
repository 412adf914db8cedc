//! Progress reporting and cancellation for corpus rebuilds.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};

/// Receives `(completed, total)` after each document is encoded.
///
/// Called synchronously from the encode loop; implementations must
/// return quickly and must not block.
pub trait ProgressReporter {
    fn on_progress(&mut self, completed: usize, total: usize);
}

impl<F> ProgressReporter for F
where
    F: FnMut(usize, usize),
{
    fn on_progress(&mut self, completed: usize, total: usize) {
        self(completed, total)
    }
}

/// Discards progress updates.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn on_progress(&mut self, _completed: usize, _total: usize) {}
}

/// Terminal progress bar drawn on stderr, created on the first update.
#[derive(Default)]
pub struct BarProgress {
    bar: Option<ProgressBar>,
}

impl BarProgress {
    pub fn new() -> Self {
        Self::default()
    }

    fn bar_for(&mut self, total: usize) -> &ProgressBar {
        self.bar.get_or_insert_with(|| {
            let style = ProgressStyle::with_template(
                "{spinner} encoding [{bar:40}] {pos}/{len} ({eta})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
            ProgressBar::new(total as u64).with_style(style)
        })
    }
}

impl ProgressReporter for BarProgress {
    fn on_progress(&mut self, completed: usize, total: usize) {
        let bar = self.bar_for(total);
        bar.set_length(total as u64);
        bar.set_position(completed as u64);
        if completed >= total {
            bar.finish_and_clear();
        }
    }
}

impl Drop for BarProgress {
    fn drop(&mut self) {
        if let Some(bar) = &self.bar {
            if !bar.is_finished() {
                bar.abandon();
            }
        }
    }
}

/// Shared flag checked between per-file encode steps.
#[derive(Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
