//! Remaining-time derivation and duration formatting

/// Tracks the print time estimate and derives time remaining.
///
/// The estimate comes from the file metadata call; the passed duration
/// from `print_stats/print_duration` deltas. An unknown estimate or a
/// passed duration beyond it yields `None` — the display shows an
/// indeterminate marker, never a negative number.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeProgress {
    estimate_secs: Option<u32>,
}

impl TimeProgress {
    /// Create with no estimate
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the estimated total print time
    pub fn set_estimate(&mut self, estimate_secs: u32) {
        self.estimate_secs = Some(estimate_secs);
    }

    /// Forget the estimate (new print, reset)
    pub fn clear(&mut self) {
        self.estimate_secs = None;
    }

    /// The current estimate, if any
    pub fn estimate(&self) -> Option<u32> {
        self.estimate_secs
    }

    /// Seconds left given the time passed so far.
    ///
    /// `None` when the estimate is unknown or already exceeded.
    pub fn remaining(&self, passed_secs: u32) -> Option<u32> {
        self.estimate_secs
            .and_then(|estimate| estimate.checked_sub(passed_secs))
    }
}

/// Render a duration in seconds as `2h 3m 45s`.
///
/// Leading zero units are omitted; zero renders as `0s`.
pub fn format_duration(total_secs: u32) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
