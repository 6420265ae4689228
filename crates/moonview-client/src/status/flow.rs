//! Volumetric flow-rate estimation
//!
//! The controller reports cumulative filament used; sampling it at
//! irregular intervals gives a volumetric flow estimate:
//! cross-section(diameter) x delta-filament / delta-time.

use std::time::{SystemTime, UNIX_EPOCH};

/// Minimum interval between accepted samples, in seconds.
const MIN_SAMPLE_INTERVAL_SECS: f64 = 1.0;

/// Estimates volumetric flow from cumulative filament-used samples.
///
/// A sample is only *accepted* once more than one second has passed
/// since the previously accepted sample; shorter intervals leave both
/// the stored baseline and the displayed value untouched. An accepted
/// sample always refreshes the baseline, but recomputes the flow only
/// when the filament reading strictly increased — so retractions or
/// resets never produce a negative rate.
#[derive(Debug, Clone)]
pub struct FlowRateEstimator {
    filament_diameter_mm: f64,
    last_filament_used: Option<f64>,
    last_sample_secs: Option<f64>,
    flow_mm3_per_sec: f64,
}

impl FlowRateEstimator {
    /// Create an estimator for the given filament diameter
    pub fn new(filament_diameter_mm: f64) -> Self {
        Self {
            filament_diameter_mm,
            last_filament_used: None,
            last_sample_secs: None,
            flow_mm3_per_sec: 0.0,
        }
    }

    /// Forget all samples and set a new diameter (print start)
    pub fn reset(&mut self, filament_diameter_mm: f64) {
        *self = Self::new(filament_diameter_mm);
    }

    /// The most recently computed flow, in mm³/s (0 until first computed)
    pub fn value(&self) -> f64 {
        self.flow_mm3_per_sec
    }

    /// Feed a filament-used reading stamped with the current wall clock
    pub fn sample(&mut self, filament_used_mm: f64) -> Option<f64> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64();
        self.sample_at(filament_used_mm, now)
    }

    /// Feed a filament-used reading stamped `now_secs`.
    ///
    /// Returns `Some(flow)` when a new value was computed, `None` when
    /// the displayed value was retained.
    pub fn sample_at(&mut self, filament_used_mm: f64, now_secs: f64) -> Option<f64> {
        if let Some(last_secs) = self.last_sample_secs {
            let elapsed = now_secs - last_secs;
            if elapsed <= MIN_SAMPLE_INTERVAL_SECS {
                // Too soon; keep the baseline so the next accepted
                // sample measures a meaningful interval.
                return None;
            }

            let recomputed = match self.last_filament_used {
                Some(last_used) if last_used < filament_used_mm => {
                    let filament_delta = filament_used_mm - last_used;
                    let radius = self.filament_diameter_mm / 2.0;
                    let cross_section = std::f64::consts::PI * radius * radius;
                    self.flow_mm3_per_sec = cross_section * filament_delta / elapsed;
                    tracing::trace!(
                        flow = self.flow_mm3_per_sec,
                        filament_delta,
                        elapsed,
                        "Recomputed flow rate"
                    );
                    Some(self.flow_mm3_per_sec)
                }
                _ => None,
            };

            self.last_filament_used = Some(filament_used_mm);
            self.last_sample_secs = Some(now_secs);
            recomputed
        } else {
            // First reading becomes the baseline; no rate yet.
            self.last_filament_used = Some(filament_used_mm);
            self.last_sample_secs = Some(now_secs);
            None
        }
    }
}
