//! Progress bar utilities for the drain phase

use kdam::{Animation, Bar, BarExt};
use std::sync::{Arc, Mutex};

use crate::utils::config::ProgressConsts;

// Progress bar type alias
pub type ProgressBar = Arc<Mutex<Bar>>;

/// Configuration for creating a progress bar
pub struct ProgressBarConfig {
    pub total: usize,
    pub desc: &'static str,
    pub animation: Animation,
}

impl ProgressBarConfig {
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
        unit = " files"
    )))
}

/// Bar for draining `total` results, or `None` when progress is off.
pub fn drain_bar(show: bool, total: usize) -> Option<ProgressBar> {
    show.then(|| {
        create_progress_bar(ProgressBarConfig::new(
            total,
            "Hashing",
            Animation::Classic,
        ))
    })
}

/// Advance the bar by `n`. Uses try_lock so a contended bar never stalls the drain.
pub fn update_progress_bar(pb: &ProgressBar, n: usize) {
    if let Ok(mut pb) = pb.try_lock() {
        let _ = pb.update(n);
    }
}

/// Called once per drained result; advances the bar every `PROGRESS_UPDATE_BATCH_SIZE` results.
pub fn report_drained(pb: Option<&ProgressBar>, drained: usize) {
    if let Some(pb) = pb
        && drained.is_multiple_of(ProgressConsts::PROGRESS_UPDATE_BATCH_SIZE)
    {
        update_progress_bar(pb, ProgressConsts::PROGRESS_UPDATE_BATCH_SIZE);
    }
}

/// Push the remainder after batched updates and close the bar line.
pub fn finish_progress(pb: Option<&ProgressBar>, drained: usize) {
    if let Some(pb) = pb {
        let remaining = drained % ProgressConsts::PROGRESS_UPDATE_BATCH_SIZE;
        if remaining > 0 {
            update_progress_bar(pb, remaining);
        }
        if let Ok(mut bar) = pb.lock() {
            let _ = bar.refresh();
            eprintln!();
        }
    }
}
