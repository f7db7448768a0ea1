//! # Scales
//!
//! Mapping between domain values and slider/chart pixel positions. The same
//! scale instance is shared by the chart axis and the range slider so both
//! agree on where a date is drawn.
//!
//! Inversion snaps to the nearest discrete sample (one day, one year); a
//! position exactly halfway between two samples resolves to the earlier one.

use std::fmt::Debug;

use chrono::{Days, NaiveDate};

use crate::dataset::RideIndex;
use crate::HandleRole;

/// Domain ⇄ pixel conversion.
pub trait Scale {
    type Value: Clone + PartialEq + Debug;

    /// Pixel position of `value` (left edge of its band).
    fn scale(&self, value: &Self::Value) -> f64;

    /// Nearest in-domain sample for a pixel position.
    fn invert(&self, position: f64) -> Self::Value;

    /// Pixel range `(start, end)`.
    fn range(&self) -> (f64, f64);

    fn set_range(&mut self, range: (f64, f64));

    /// Width in pixels of one domain sample.
    fn band_width(&self) -> f64;

    /// Offset added to a handle's position before inversion.
    fn value_offset(&self, _role: HandleRole) -> f64 {
        0.0
    }
}

/// Index of the nearest sample for a fractional sample coordinate.
/// Ties resolve toward the earlier sample.
fn nearest_sample(t: f64) -> f64 {
    let floor = t.floor();
    if t - floor > 0.5 {
        floor + 1.0
    } else {
        floor
    }
}

/// Calendar-day scale: one band per day bucket across the track.
///
/// The end handle sits on the right edge of the last selected day's bar, so
/// its value is read one band to the left.
#[derive(Debug, Clone, PartialEq)]
pub struct DayScale {
    start: NaiveDate,
    days: usize,
    range: (f64, f64),
}

impl DayScale {
    pub fn new(start: NaiveDate, days: usize, range: (f64, f64)) -> Self {
        Self {
            start,
            days: days.max(1),
            range,
        }
    }

    /// Scale spanning every bucket of `index` over `[0, track_width]`.
    pub fn for_index(index: &RideIndex, track_width: f64) -> Self {
        Self::new(index.start_date(), index.len(), (0.0, track_width))
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start
    }

    pub fn end_date(&self) -> NaiveDate {
        self.date_at(self.days - 1)
    }

    pub fn days(&self) -> usize {
        self.days
    }

    fn date_at(&self, offset: usize) -> NaiveDate {
        self.start
            .checked_add_days(Days::new(offset as u64))
            .unwrap_or(NaiveDate::MAX)
    }
}

impl Scale for DayScale {
    type Value = NaiveDate;

    fn scale(&self, value: &NaiveDate) -> f64 {
        let offset = (*value - self.start).num_days() as f64;
        self.range.0 + offset * self.band_width()
    }

    fn invert(&self, position: f64) -> NaiveDate {
        let band = self.band_width();
        if band <= 0.0 || !position.is_finite() {
            return self.start;
        }
        let t = nearest_sample((position - self.range.0) / band);
        let offset = t.clamp(0.0, (self.days - 1) as f64) as usize;
        self.date_at(offset)
    }

    fn range(&self) -> (f64, f64) {
        self.range
    }

    fn set_range(&mut self, range: (f64, f64)) {
        self.range = range;
    }

    fn band_width(&self) -> f64 {
        (self.range.1 - self.range.0) / self.days as f64
    }

    fn value_offset(&self, role: HandleRole) -> f64 {
        match role {
            HandleRole::Start => 0.0,
            HandleRole::End => -self.band_width(),
        }
    }
}

/// Linear scale over whole years, used by the yearly count chart.
#[derive(Debug, Clone, PartialEq)]
pub struct YearScale {
    min: i32,
    max: i32,
    range: (f64, f64),
}

impl YearScale {
    pub fn new(min: i32, max: i32, range: (f64, f64)) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        Self { min, max, range }
    }

    pub fn domain(&self) -> (i32, i32) {
        (self.min, self.max)
    }

    fn span(&self) -> f64 {
        (self.max - self.min).max(1) as f64
    }
}

impl Scale for YearScale {
    type Value = i32;

    fn scale(&self, value: &i32) -> f64 {
        self.range.0 + (*value - self.min) as f64 * self.band_width()
    }

    fn invert(&self, position: f64) -> i32 {
        let band = self.band_width();
        if band <= 0.0 || !position.is_finite() {
            return self.min;
        }
        let t = nearest_sample((position - self.range.0) / band);
        self.min + t.clamp(0.0, (self.max - self.min) as f64) as i32
    }

    fn range(&self) -> (f64, f64) {
        self.range
    }

    fn set_range(&mut self, range: (f64, f64)) {
        self.range = range;
    }

    fn band_width(&self) -> f64 {
        (self.range.1 - self.range.0) / self.span()
    }
}
