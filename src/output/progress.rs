//! Progress bar utilities for window processing.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Create a progress bar over the planned windows.
pub fn create_window_progress(total_windows: usize, enabled: bool) -> Option<ProgressBar> {
    if !enabled || total_windows == 0 {
        return None;
    }

    let pb = ProgressBar::new(total_windows as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} windows ({eta})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░ "),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    Some(pb)
}

/// Finish a progress bar with a message.
pub fn finish_progress(pb: Option<&ProgressBar>, message: &str) {
    if let Some(pb) = pb {
        pb.finish_with_message(message.to_string());
    }
}

/// Abandon a progress bar after a failure.
pub fn abandon_progress(pb: Option<&ProgressBar>) {
    if let Some(pb) = pb {
        pb.abandon();
    }
}

/// Increment a progress bar.
pub fn inc_progress(pb: Option<&ProgressBar>) {
    if let Some(pb) = pb {
        pb.inc(1);
    }
}
