//! # Ride Map
//!
//! Synchronization core for an interactive ride map: a map of ride paths, a
//! daily distance chart and a dual-handle range slider that must agree on the
//! selected date window and on which rides are active or highlighted.
//!
//! This library provides:
//! - A day-bucketed ride index with date window queries
//! - A generic range slider over pluggable scales with eased animation
//! - A year range controller resolving handles to yearly count samples
//! - A coalescing, throttled selection synchronizer
//! - Shift-accumulating hover highlights and a ride playback animator
//!
//! Rendering, pointer tracking and transport stay with the host, which talks
//! to the engine through [`MapView`] and drives timers with
//! [`Timed::next_deadline`] / [`Timed::tick`].
//!
//! ## Features
//!
//! - **`http`** - Enable HTTP client for dataset fetching
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use std::collections::HashSet;
//! use ride_map::{
//!     loader, run_until, MapView, RideIndex, RideMapConfig, RideMapEngine, ScreenPoint,
//! };
//!
//! #[derive(Default)]
//! struct Map {
//!     active: HashSet<String>,
//! }
//!
//! impl MapView for Map {
//!     fn set_active_rides(&mut self, ids: &HashSet<String>) {
//!         self.active = ids.clone();
//!     }
//!     fn set_highlighted_rides(&mut self, _ids: &HashSet<String>) {}
//!     fn features_near(&self, _point: ScreenPoint, _radius: f64) -> Vec<String> {
//!         Vec::new()
//!     }
//! }
//!
//! let rides = loader::parse_rides_json(
//!     r#"[{"name": "commute", "date": "2016-04-10", "length": 12.4}]"#,
//! )?;
//! let index = RideIndex::from_records(rides)?;
//! let mut engine = RideMapEngine::new(index, Map::default(), RideMapConfig::default(), 0)?;
//!
//! run_until(&mut engine, 1_000);
//! assert!(engine.map().active.contains("commute"));
//! # Ok::<(), ride_map::RideMapError>(())
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{OptionExt, Result, RideMapError};

// Engine configuration
pub mod config;
pub use config::RideMapConfig;

// Day-bucketed ride index and yearly count series
pub mod dataset;
pub use dataset::{CountSeries, DayBucket, RideIndex};

// Domain ⇄ pixel scales
pub mod scale;
pub use scale::{DayScale, Scale, YearScale};

// Virtual-time timers
pub mod scheduler;
pub use scheduler::{run_until, Millis, OneShotTimer, Timed};

// Dual-handle range slider
pub mod slider;
pub use slider::{RangeSlider, SliderEvent, SliderHandle};

// Year-domain slider over the yearly count series
pub mod years;
pub use years::{count_label, YearRangeController, YearRangeEvent};

// Typed observer registration
pub mod events;
pub use events::{EventBus, EventKind, RideMapEvent, SubscriptionId};

// Date window → ActiveSet pipeline
pub mod sync;
pub use sync::{DateWindow, SelectionSynchronizer};

// Hover highlighting
pub mod hover;
pub use hover::{HighlightChange, HoverController, Key};

// Ride-by-ride playback
pub mod playback;
pub use playback::{PlaybackAnimator, PlaybackState};

// Composition root
pub mod engine;
pub use engine::{MapView, RideMapEngine, ScreenPoint};

// Ride and count parsing from strings and files
pub mod loader;

// HTTP dataset fetching (optional)
#[cfg(feature = "http")]
pub mod http;
#[cfg(feature = "http")]
pub use http::{Dataset, DatasetFetcher};

// ============================================================================
// Core Types
// ============================================================================

/// One ride, truncated to its calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RideRecord {
    /// Unique ride name, also the map feature id
    pub name: String,
    pub date: NaiveDate,
    /// Ride length in the dataset's unit
    pub length: f64,
}

impl RideRecord {
    pub fn new(name: impl Into<String>, date: NaiveDate, length: f64) -> Self {
        Self {
            name: name.into(),
            date,
            length,
        }
    }
}

/// One sample of the yearly count series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCount {
    pub year: i32,
    pub count: u64,
}

/// Which end of the range a slider handle controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandleRole {
    Start,
    End,
}

impl HandleRole {
    /// The partner handle.
    pub fn other(self) -> Self {
        match self {
            HandleRole::Start => HandleRole::End,
            HandleRole::End => HandleRole::Start,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_role_other() {
        assert_eq!(HandleRole::Start.other(), HandleRole::End);
        assert_eq!(HandleRole::End.other().other(), HandleRole::End);
    }

    #[test]
    fn test_ride_record_serde() {
        let ride = RideRecord::new(
            "lake loop",
            NaiveDate::from_ymd_opt(2016, 4, 10).unwrap(),
            23.5,
        );
        let json = serde_json::to_string(&ride).unwrap();
        assert!(json.contains("\"2016-04-10\""));
        let back: RideRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ride);
    }
}
