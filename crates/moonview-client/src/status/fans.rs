//! Fan speed tracking
//!
//! The controller reports each fan under its own key, as a 0..1
//! fraction named `value` (controllable fans) or `speed` (monitored
//! fans). A delta mentions only the fans that changed; the rest keep
//! their last-known percentage.

use moonview_core::{value_at, StateStore};
use serde_json::Value;
use std::collections::BTreeMap;

/// Read a fan fraction from `root` at `<fan>/value` or `<fan>/speed`,
/// scaled to a percentage.
fn fan_percent(root: &Value, fan_name: &str) -> Option<i32> {
    for field in ["value", "speed"] {
        let node = value_at(root, &format!("{}/{}", fan_name, field));
        if let Some(fraction) = node.as_f64() {
            return Some((fraction * 100.0) as i32);
        }
    }
    None
}

/// Last-known percentage per fan, in stable (sorted) display order.
#[derive(Debug, Clone, Default)]
pub struct FanSpeeds {
    speeds: BTreeMap<String, i32>,
}

impl FanSpeeds {
    /// Create with no fans known
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the map from current store values for the named fans.
    ///
    /// Fans with no reported value yet are left out; they join the map
    /// once a delta mentions them after [`FanSpeeds::track`].
    pub fn seed<'a>(&mut self, fan_names: impl IntoIterator<Item = &'a str>, store: &StateStore) {
        for name in fan_names {
            if let Some(percent) = fan_percent(store.root(), &format!("printer_state/{}", name)) {
                self.speeds.insert(name.to_string(), percent);
            }
        }
    }

    /// Start tracking a fan at 0% if it is not yet known
    pub fn track(&mut self, fan_name: &str) {
        self.speeds.entry(fan_name.to_string()).or_insert(0);
    }

    /// Update every tracked fan the delta mentions.
    ///
    /// Returns true when any percentage changed.
    pub fn observe(&mut self, delta: &Value) -> bool {
        let mut changed = false;
        for (name, percent) in self.speeds.iter_mut() {
            if let Some(new_percent) = fan_percent(delta, name) {
                if *percent != new_percent {
                    *percent = new_percent;
                    changed = true;
                }
            }
        }
        changed
    }

    /// Percentage of one fan, if tracked
    pub fn percent(&self, fan_name: &str) -> Option<i32> {
        self.speeds.get(fan_name).copied()
    }

    /// All known fans joined for display: `40%, 100%`
    pub fn display(&self) -> String {
        self.speeds
            .values()
            .map(|percent| format!("{}%", percent))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Number of tracked fans
    pub fn len(&self) -> usize {
        self.speeds.len()
    }

    /// True when no fan is tracked
    pub fn is_empty(&self) -> bool {
        self.speeds.is_empty()
    }
}
