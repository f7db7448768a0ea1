//! Engine configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RideMapError, Result};

/// Configuration for the ride map engine.
///
/// Every field has a default, so a partial JSON document is enough:
/// `{"coalesce_delay_ms": 10}` keeps everything else at its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RideMapConfig {
    /// Coalescing window for selection recomputation requests.
    /// Default: 30 ms
    pub coalesce_delay_ms: u64,

    /// Minimum interval between two ActiveSet applications.
    /// Default: 100 ms
    pub min_update_interval_ms: u64,

    /// Default duration of an animated `slide_to`.
    /// Default: 2000 ms
    pub slide_duration_ms: u64,

    /// Pixel radius used when asking the map for features under the pointer.
    /// Default: 5.0
    pub hover_radius_px: f64,

    /// Delay between two playback steps. Minimal so the host can render in between.
    /// Default: 1 ms
    pub playback_step_ms: u64,

    /// Width of the initial selection, ending on the last ride day.
    /// Default: 90 days
    pub initial_window_days: u32,

    /// Slider track width in pixels until the host reports a resize.
    /// Default: 800.0
    pub track_width: f64,
}

impl Default for RideMapConfig {
    fn default() -> Self {
        Self {
            coalesce_delay_ms: 30,
            min_update_interval_ms: 100,
            slide_duration_ms: 2000,
            hover_radius_px: 5.0,
            playback_step_ms: 1,
            initial_window_days: 90,
            track_width: 800.0,
        }
    }
}

impl RideMapConfig {
    /// Parse and validate a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: RideMapConfig = serde_json::from_str(json)
            .map_err(|e| RideMapError::config(format!("invalid config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            RideMapError::config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.track_width.is_finite() || self.track_width <= 0.0 {
            return Err(RideMapError::config(format!(
                "track_width must be positive, got {}",
                self.track_width
            )));
        }
        if !self.hover_radius_px.is_finite() || self.hover_radius_px < 0.0 {
            return Err(RideMapError::config(format!(
                "hover_radius_px must be non-negative, got {}",
                self.hover_radius_px
            )));
        }
        if self.initial_window_days == 0 {
            return Err(RideMapError::config("initial_window_days must be at least 1"));
        }
        Ok(())
    }
}
