//! Combined print-status tracking
//!
//! [`PrintStatusTracker`] is the consumer a print-status panel wraps: it
//! digests every status delta into display-ready values — temperatures
//! with their targets, requested speed, z-offset, fan percentages,
//! elapsed/remaining time, flow rate, layer pair, progress percentage,
//! and pause state. The panel itself only renders these values.

use crate::fanout::NotifyConsumer;
use crate::status::{format_duration, FanSpeeds, FlowRateEstimator, LayerProgress, TimeProgress};
use moonview_core::{value_at, StateStore};
use serde_json::Value;

/// Store path for the configured filament diameter.
const FILAMENT_DIAMETER_PATH: &str =
    "printer_state/configfile/config/extruder/filament_diameter";

/// Derives display values for an active print from status deltas.
#[derive(Debug, Clone)]
pub struct PrintStatusTracker {
    default_filament_diameter: f64,
    time: TimeProgress,
    flow: FlowRateEstimator,
    layers: LayerProgress,
    fans: FanSpeeds,
    extruder_target: f64,
    bed_target: f64,
    extruder_display: String,
    bed_display: String,
    speed_display: String,
    z_offset_mm: f64,
    progress_percent: i32,
    elapsed_secs: u32,
    paused: bool,
}

impl PrintStatusTracker {
    /// Create a tracker with the given fallback filament diameter (mm)
    pub fn new(default_filament_diameter: f64) -> Self {
        Self {
            default_filament_diameter,
            time: TimeProgress::new(),
            flow: FlowRateEstimator::new(default_filament_diameter),
            layers: LayerProgress::new(),
            fans: FanSpeeds::new(),
            extruder_target: -1.0,
            bed_target: -1.0,
            extruder_display: String::new(),
            bed_display: String::new(),
            speed_display: "0 mm/s".to_string(),
            z_offset_mm: 0.0,
            progress_percent: 0,
            elapsed_secs: 0,
            paused: false,
        }
    }

    /// Reset derived state for a new print.
    ///
    /// Re-reads the filament diameter from the printer config tree; the
    /// config reports it as a string, older firmwares as a number.
    pub fn reset(&mut self, store: &StateStore) {
        let diameter = store
            .get_string(FILAMENT_DIAMETER_PATH)
            .and_then(|s| s.parse::<f64>().ok())
            .or_else(|| store.get_f64(FILAMENT_DIAMETER_PATH))
            .unwrap_or(self.default_filament_diameter);

        self.time.clear();
        self.flow.reset(diameter);
        self.layers.reset();
        self.extruder_target = -1.0;
        self.bed_target = -1.0;
        self.speed_display = "0 mm/s".to_string();
        self.progress_percent = 0;
        self.elapsed_secs = 0;
    }

    /// Seed the fan map from the store for the configured fan names
    pub fn bootstrap_fans<'a>(
        &mut self,
        fan_names: impl IntoIterator<Item = &'a str>,
        store: &StateStore,
    ) {
        self.fans.seed(fan_names, store);
    }

    /// Set the estimated total print time (from file metadata)
    pub fn set_time_estimate(&mut self, estimate_secs: u32) {
        self.time.set_estimate(estimate_secs);
    }

    /// Extruder temperature display, `205 / 210` while heating
    pub fn extruder_display(&self) -> &str {
        &self.extruder_display
    }

    /// Bed temperature display
    pub fn bed_display(&self) -> &str {
        &self.bed_display
    }

    /// Requested print speed display
    pub fn speed_display(&self) -> &str {
        &self.speed_display
    }

    /// Current z-offset in mm
    pub fn z_offset_mm(&self) -> f64 {
        self.z_offset_mm
    }

    /// Tracked fan percentages
    pub fn fans(&self) -> &FanSpeeds {
        &self.fans
    }

    /// Shown layer pair
    pub fn layers(&self) -> Option<(u32, u32)> {
        self.layers.display()
    }

    /// Current flow estimate in mm³/s
    pub fn flow_mm3_per_sec(&self) -> f64 {
        self.flow.value()
    }

    /// Progress bar percentage
    pub fn progress_percent(&self) -> i32 {
        self.progress_percent
    }

    /// Whether the print is paused
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Elapsed print time display
    pub fn elapsed_display(&self) -> String {
        format_duration(self.elapsed_secs)
    }

    /// Remaining time display; `...` while indeterminate
    pub fn remaining_display(&self) -> String {
        match self.time.remaining(self.elapsed_secs) {
            Some(remaining) => format_duration(remaining),
            None => "...".to_string(),
        }
    }

    fn temp_display(temperature: f64, target: f64) -> String {
        if target > 0.0 {
            format!("{} / {}", temperature as i64, target as i64)
        } else {
            format!("{}", temperature as i64)
        }
    }
}

impl NotifyConsumer for PrintStatusTracker {
    fn consume(&mut self, delta: &Value, store: &StateStore) {
        // A filename in the delta signals the start of a print.
        if value_at(delta, "print_stats/filename")
            .as_str()
            .is_some_and(|name| !name.is_empty())
        {
            self.reset(store);
        }

        if let Some(target) = value_at(delta, "extruder/target").as_f64() {
            self.extruder_target = target;
        }
        if let Some(target) = value_at(delta, "heater_bed/target").as_f64() {
            self.bed_target = target;
        }
        if let Some(temperature) = value_at(delta, "extruder/temperature").as_f64() {
            self.extruder_display = Self::temp_display(temperature, self.extruder_target);
        }
        if let Some(temperature) = value_at(delta, "heater_bed/temperature").as_f64() {
            self.bed_display = Self::temp_display(temperature, self.bed_target);
        }

        // Requested speed = commanded speed (mm/min) scaled by the
        // current factor; the factor comes from the store since the
        // delta rarely carries both.
        if let Some(speed) = value_at(delta, "gcode_move/speed").as_f64() {
            if let Some(factor) = store.get_f64("printer_state/gcode_move/speed_factor") {
                let requested = (speed / 60.0 * factor) as i64;
                self.speed_display = format!("{} mm/s", requested);
            }
        }

        if let Some(z_offset) = value_at(delta, "gcode_move/homing_origin/2").as_f64() {
            self.z_offset_mm = z_offset;
        }

        self.fans.observe(delta);

        if let Some(passed) = value_at(delta, "print_stats/print_duration").as_f64() {
            self.elapsed_secs = passed as u32;
        }

        if let Some(progress) = value_at(delta, "virtual_sdcard/progress").as_f64() {
            let percent = (progress * 100.0) as i32;
            // Only move the bar on whole-percent advances.
            if percent >= self.progress_percent + 1 {
                self.progress_percent = percent;
            }
        }

        if let Some(filament_used) = value_at(delta, "print_stats/filament_used").as_f64() {
            self.flow.sample(filament_used);
        }

        if let Some(paused) = value_at(delta, "pause_resume/is_paused").as_bool() {
            self.paused = paused;
        }

        let info = value_at(delta, "print_stats/info");
        if !info.is_null() {
            self.layers.observe(
                value_at(info, "current_layer").as_u64().map(|v| v as u32),
                value_at(info, "total_layer").as_u64().map(|v| v as u32),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fixture() -> (PrintStatusTracker, StateStore) {
        (PrintStatusTracker::new(1.75), StateStore::new())
    }

    #[test]
    fn test_temperature_display_with_and_without_target() {
        let (mut tracker, store) = fixture();

        tracker.consume(&json!({ "extruder": { "temperature": 198.6 } }), &store);
        assert_eq!(tracker.extruder_display(), "198");

        tracker.consume(
            &json!({ "extruder": { "target": 210.0, "temperature": 205.2 } }),
            &store,
        );
        assert_eq!(tracker.extruder_display(), "205 / 210");

        // Target back to 0: plain reading again.
        tracker.consume(
            &json!({ "extruder": { "target": 0.0, "temperature": 180.0 } }),
            &store,
        );
        assert_eq!(tracker.extruder_display(), "180");
    }

    #[test]
    fn test_requested_speed_uses_store_factor() {
        let (mut tracker, mut store) = fixture();
        store.apply_status(&json!({ "gcode_move": { "speed_factor": 1.5 } }));

        tracker.consume(&json!({ "gcode_move": { "speed": 6000.0 } }), &store);
        // 6000 mm/min / 60 * 1.5 = 150 mm/s
        assert_eq!(tracker.speed_display(), "150 mm/s");

        // Without a factor in the store the display stays put.
        let (mut fresh, empty_store) = fixture();
        fresh.consume(&json!({ "gcode_move": { "speed": 6000.0 } }), &empty_store);
        assert_eq!(fresh.speed_display(), "0 mm/s");
    }

    #[test]
    fn test_z_offset_from_homing_origin() {
        let (mut tracker, store) = fixture();
        tracker.consume(
            &json!({ "gcode_move": { "homing_origin": [0.0, 0.0, 0.05, 0.0] } }),
            &store,
        );
        assert!((tracker.z_offset_mm() - 0.05).abs() < 1e-9);
    }

    #[test]
    fn test_remaining_indeterminate_until_estimated() {
        let (mut tracker, store) = fixture();

        tracker.consume(&json!({ "print_stats": { "print_duration": 150.0 } }), &store);
        assert_eq!(tracker.remaining_display(), "...");
        assert_eq!(tracker.elapsed_display(), "2m 30s");

        tracker.set_time_estimate(600);
        assert_eq!(tracker.remaining_display(), "7m 30s");
    }

    #[test]
    fn test_remaining_overrun_shows_indeterminate() {
        let (mut tracker, store) = fixture();
        tracker.set_time_estimate(100);
        tracker.consume(&json!({ "print_stats": { "print_duration": 150.0 } }), &store);
        assert_eq!(tracker.remaining_display(), "...");
    }

    #[test]
    fn test_progress_advances_on_whole_percent_only() {
        let (mut tracker, store) = fixture();

        tracker.consume(&json!({ "virtual_sdcard": { "progress": 0.014 } }), &store);
        assert_eq!(tracker.progress_percent(), 1);

        // Sub-percent jitter does not move the bar.
        tracker.consume(&json!({ "virtual_sdcard": { "progress": 0.018 } }), &store);
        assert_eq!(tracker.progress_percent(), 1);

        tracker.consume(&json!({ "virtual_sdcard": { "progress": 0.021 } }), &store);
        assert_eq!(tracker.progress_percent(), 2);
    }

    #[test]
    fn test_pause_state() {
        let (mut tracker, store) = fixture();
        assert!(!tracker.is_paused());
        tracker.consume(&json!({ "pause_resume": { "is_paused": true } }), &store);
        assert!(tracker.is_paused());
        tracker.consume(&json!({ "pause_resume": { "is_paused": false } }), &store);
        assert!(!tracker.is_paused());
    }

    #[test]
    fn test_layers_from_print_stats_info() {
        let (mut tracker, store) = fixture();
        tracker.consume(
            &json!({ "print_stats": { "info": { "current_layer": 3, "total_layer": 120 } } }),
            &store,
        );
        assert_eq!(tracker.layers(), Some((3, 120)));

        // Regression in a later delta is ignored.
        tracker.consume(
            &json!({ "print_stats": { "info": { "current_layer": 2 } } }),
            &store,
        );
        assert_eq!(tracker.layers(), Some((3, 120)));
    }

    #[test]
    fn test_filename_resets_derived_state() {
        let (mut tracker, mut store) = fixture();
        store.apply_status(&json!({
            "configfile": { "config": { "extruder": { "filament_diameter": "2.85" } } }
        }));

        tracker.set_time_estimate(600);
        tracker.consume(&json!({ "print_stats": { "print_duration": 90.0 } }), &store);
        tracker.consume(&json!({ "virtual_sdcard": { "progress": 0.5 } }), &store);
        assert_eq!(tracker.progress_percent(), 50);

        tracker.consume(
            &json!({ "print_stats": { "filename": "next_part.gcode" } }),
            &store,
        );
        assert_eq!(tracker.progress_percent(), 0);
        assert_eq!(tracker.remaining_display(), "...");
        assert_eq!(tracker.elapsed_display(), "0s");
    }

    #[test]
    fn test_fan_updates_flow_through() {
        let (mut tracker, mut store) = fixture();
        store.apply_status(&json!({ "fan": { "speed": 0.2 } }));
        tracker.bootstrap_fans(["fan"], &store);
        assert_eq!(tracker.fans().percent("fan"), Some(20));

        tracker.consume(&json!({ "fan": { "speed": 0.65 } }), &store);
        assert_eq!(tracker.fans().percent("fan"), Some(65));
        assert_eq!(tracker.fans().display(), "65%");
    }
}
