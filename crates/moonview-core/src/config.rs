//! Configuration and settings management for moonview
//!
//! Provides the settings the client needs at startup: the controller API
//! endpoint, reconnect backoff bounds, channel capacities, and printer
//! defaults. Stored as JSON; every field has a serde default so partial
//! files load cleanly.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Reconnect backoff settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectSettings {
    /// Delay before the first reconnect attempt, in milliseconds
    pub initial_delay_ms: u64,
    /// Upper bound for the backoff delay, in milliseconds
    pub max_delay_ms: u64,
}

impl Default for ReconnectSettings {
    fn default() -> Self {
        Self {
            initial_delay_ms: 500,
            max_delay_ms: 15_000,
        }
    }
}

/// Client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Websocket URL of the printer controller API
    pub endpoint: String,
    /// Reconnect backoff bounds
    pub reconnect: ReconnectSettings,
    /// Capacity of the outbound frame queue
    pub outbound_queue: usize,
    /// Capacity of the connection event broadcast channel
    pub event_capacity: usize,
    /// Filament diameter fallback when the printer config reports none, in mm
    pub filament_diameter_mm: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: "ws://127.0.0.1:7125/websocket".to_string(),
            reconnect: ReconnectSettings::default(),
            outbound_queue: 64,
            event_capacity: 32,
            filament_diameter_mm: 1.75,
        }
    }
}

impl Settings {
    /// Load settings from a JSON file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let settings = serde_json::from_str(&contents)?;
        Ok(settings)
    }

    /// Save settings to a JSON file, creating parent directories as needed
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Validate settings values
    pub fn validate(&self) -> Result<()> {
        if !self.endpoint.starts_with("ws://") && !self.endpoint.starts_with("wss://") {
            return Err(crate::TransportError::InvalidUrl {
                url: self.endpoint.clone(),
            }
            .into());
        }
        if self.reconnect.initial_delay_ms == 0
            || self.reconnect.max_delay_ms < self.reconnect.initial_delay_ms
        {
            return Err(Error::other("Invalid reconnect backoff bounds"));
        }
        if self.filament_diameter_mm <= 0.0 {
            return Err(Error::other("Filament diameter must be positive"));
        }
        Ok(())
    }
}
