//! Progress bar utilities for displaying search status

use kdam::{Animation, Bar, BarExt};
use std::sync::{Arc, Mutex};

use crate::pipeline::ProgressCallback;

// Progress bar type alias
pub type ProgressBar = Arc<Mutex<Bar>>;

/// Configuration for creating a progress bar
pub struct ProgressBarConfig {
    pub total: usize,
    pub desc: &'static str,
    pub animation: Animation,
}

impl ProgressBarConfig {
    /// Create a new progress bar configuration
    pub fn new(total: usize, desc: &'static str, animation: Animation) -> Self {
        Self {
            total,
            desc,
            animation,
        }
    }
}

/// Create a progress bar with the given configuration
pub fn create_progress_bar(config: ProgressBarConfig) -> ProgressBar {
    Arc::new(Mutex::new(kdam::tqdm!(
        total = config.total,
        desc = config.desc,
        animation = config.animation,
        unit = " queries"
    )))
}

/// Update progress bar if available
/// Uses try_lock to avoid blocking if mutex is contended (non-blocking)
pub fn update_progress_bar(pb: &ProgressBar, n: usize) {
    // Skipped updates are caught up on the next one.
    if let Ok(mut pb) = pb.try_lock() {
        let _ = pb.update(n);
    }
}

/// Push the bar to its total, e.g. after skipped updates.
pub fn finish_progress_bar(pb: &ProgressBar) {
    if let Ok(mut bar) = pb.lock() {
        let remaining = bar.total.saturating_sub(bar.counter);
        if remaining > 0 {
            let _ = bar.update(remaining);
        }
        let _ = bar.refresh();
    }
}

/// Create a dispatcher progress callback that updates the progress bar.
pub fn progress_callback(bar: &Option<ProgressBar>) -> Option<ProgressCallback> {
    bar.as_ref().map(|bar| {
        let bar = Arc::clone(bar);
        Arc::new(move |n: usize| update_progress_bar(&bar, n)) as ProgressCallback
    })
}
