//! Monotonic layer-progress display

/// Tracks the displayed current/total layer pair.
///
/// Status deltas can arrive duplicated or out of order; the shown pair
/// only ever moves forward. An observation updates the display when the
/// newly reported current *or* total layer is strictly greater than the
/// shown one.
#[derive(Debug, Clone, Copy, Default)]
pub struct LayerProgress {
    shown: Option<(u32, u32)>,
}

impl LayerProgress {
    /// Create with nothing shown yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the shown pair (print start)
    pub fn reset(&mut self) {
        self.shown = None;
    }

    /// The displayed (current, total) pair, once one exists
    pub fn display(&self) -> Option<(u32, u32)> {
        self.shown
    }

    /// Feed newly reported layer values; either may be absent from the
    /// delta. Returns true when the display changed.
    pub fn observe(&mut self, current: Option<u32>, total: Option<u32>) -> bool {
        let (shown_current, shown_total) = match self.shown {
            Some((c, t)) => (i64::from(c), i64::from(t)),
            None => (-1, -1),
        };

        let new_current = current.map_or(shown_current, i64::from);
        let new_total = total.map_or(shown_total, i64::from);

        if new_current > shown_current || new_total > shown_total {
            self.shown = Some((new_current.max(0) as u32, new_total.max(0) as u32));
            true
        } else {
            false
        }
    }
}
