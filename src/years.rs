//! # Year Range Controller
//!
//! The yearly count chart's range slider. Handles move over whole years and
//! every resolved year is matched to the nearest data sample, whose count
//! the chart shows next to the handle. Output is drained with
//! [`YearRangeController::take_events`], like the day slider.

use log::debug;

use crate::dataset::CountSeries;
use crate::error::{RideMapError, Result};
use crate::scale::{Scale, YearScale};
use crate::scheduler::{Millis, Timed};
use crate::slider::{RangeSlider, SlideCallback, SliderEvent};
use crate::{DailyCount, HandleRole};

/// Distance from a track end under which a handle's tooltip opens inward.
pub const TOOLTIP_FLIP_MARGIN_PX: f64 = 100.0;

/// Observable year slider output.
#[derive(Debug, Clone, PartialEq)]
pub enum YearRangeEvent {
    /// A handle resolved to a new year; `sample` is the closest data point
    SampleChanged {
        role: HandleRole,
        year: i32,
        sample: DailyCount,
    },
    /// The visual thumb must follow a move it did not originate
    ThumbMoved { role: HandleRole, position: f64 },
    SlideFinished,
}

/// Tooltip text for a sample count.
pub fn count_label(count: u64) -> String {
    if count == 1 {
        "1 Building".to_string()
    } else {
        format!("{} Buildings", count)
    }
}

/// Range slider bound to a yearly count series.
pub struct YearRangeController {
    slider: RangeSlider<YearScale>,
    series: CountSeries,
    events: Vec<YearRangeEvent>,
}

impl YearRangeController {
    /// Span the series' year extent over `[0, track_width]` with both handles
    /// at the ends. The first drained events carry the initial samples.
    pub fn new(series: CountSeries, track_width: f64) -> Result<Self> {
        let (min, max) = series
            .extent()
            .ok_or_else(|| RideMapError::data_load("count series has no samples"))?;
        if !track_width.is_finite() || track_width <= 0.0 {
            return Err(RideMapError::config(format!(
                "track_width must be positive, got {}",
                track_width
            )));
        }

        let scale = YearScale::new(min, max, (0.0, track_width));
        let mut controller = Self {
            slider: RangeSlider::new(scale, 0.0, track_width),
            series,
            events: Vec::new(),
        };
        controller.drain_slider();
        debug!(
            "[YearRange] {} samples from {} to {}",
            controller.series.samples().len(),
            min,
            max
        );
        Ok(controller)
    }

    pub fn from_counts(counts: Vec<DailyCount>, track_width: f64) -> Result<Self> {
        Self::new(CountSeries::new(counts), track_width)
    }

    pub fn series(&self) -> &CountSeries {
        &self.series
    }

    pub fn slider(&self) -> &RangeSlider<YearScale> {
        &self.slider
    }

    /// Selected `(start, end)` years.
    pub fn selection(&self) -> Option<(i32, i32)> {
        self.slider.selection()
    }

    /// Data sample closest to a handle's year.
    pub fn sample(&self, role: HandleRole) -> Option<DailyCount> {
        let year = *self.slider.handle(role).value()?;
        self.series.nearest(year as f64).copied()
    }

    pub fn selection_samples(&self) -> Option<(DailyCount, DailyCount)> {
        Some((self.sample(HandleRole::Start)?, self.sample(HandleRole::End)?))
    }

    /// Whether a handle sits close enough to its outer track end that its
    /// tooltip has to open toward the middle.
    pub fn tooltip_flipped(&self, role: HandleRole) -> bool {
        let (track_start, track_end) = self.slider.scale().range();
        let position = self.slider.handle(role).position();
        match role {
            HandleRole::Start => position - track_start < TOOLTIP_FLIP_MARGIN_PX,
            HandleRole::End => track_end - position < TOOLTIP_FLIP_MARGIN_PX,
        }
    }

    pub fn update(&mut self, role: HandleRole, position: f64, force_propagate: bool) {
        self.slider.update(role, position, force_propagate);
        self.drain_slider();
    }

    pub fn drag_start(&mut self, role: HandleRole) {
        self.slider.drag_start(role);
    }

    pub fn drag(&mut self, role: HandleRole, dx: f64) {
        self.slider.drag(role, dx);
        self.drain_slider();
    }

    pub fn drag_end(&mut self, role: HandleRole) {
        self.slider.drag_end(role);
        self.drain_slider();
    }

    /// Animate the handles onto two years.
    pub fn slide_to(
        &mut self,
        start_year: i32,
        end_year: i32,
        duration: Millis,
        now: Millis,
        on_complete: Option<SlideCallback>,
    ) {
        let scale = self.slider.scale();
        let start_px = scale.scale(&start_year) - scale.value_offset(HandleRole::Start);
        let end_px = scale.scale(&end_year) - scale.value_offset(HandleRole::End);
        self.slider.slide_to(start_px, end_px, duration, now, on_complete);
    }

    pub fn resize(&mut self, track_width: f64) {
        self.slider.resize(track_width);
        self.drain_slider();
    }

    /// Drain events produced since the last call.
    pub fn take_events(&mut self) -> Vec<YearRangeEvent> {
        std::mem::take(&mut self.events)
    }

    fn drain_slider(&mut self) {
        for event in self.slider.take_events() {
            let event = match event {
                SliderEvent::ValueChanged { role, value } => {
                    let Some(sample) = self.series.nearest(value as f64).copied() else {
                        continue;
                    };
                    YearRangeEvent::SampleChanged {
                        role,
                        year: value,
                        sample,
                    }
                }
                SliderEvent::ThumbMoved { role, position } => {
                    YearRangeEvent::ThumbMoved { role, position }
                }
                SliderEvent::SlideFinished => YearRangeEvent::SlideFinished,
            };
            self.events.push(event);
        }
    }
}

impl Timed for YearRangeController {
    fn next_deadline(&self) -> Option<Millis> {
        self.slider.next_deadline()
    }

    fn tick(&mut self, now: Millis) {
        self.slider.tick(now);
        self.drain_slider();
    }
}
