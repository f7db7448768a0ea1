//! # Ride Map Engine
//!
//! Wires the dataset index, range slider, synchronizer, hover controller and
//! playback animator around one map collaborator.
//!
//! ## Architecture
//!
//! Every collaborator is handed to the engine at construction; there is no
//! shared global state. The host forwards its events:
//! - pointer drags and resizes → `drag_*`, `resize`
//! - pointer hover and Shift key → `hover`, `key_down`, `key_up`
//! - the Play/Clear button → `press_playback`
//! - timers → `tick(now)` whenever `next_deadline()` is reached
//!
//! The map's visual state (ActiveSet, HighlightSet) has a single writer, the
//! engine, which applies whatever the synchronizer, hover controller or
//! playback last produced. While playback is not `Clear` it owns the
//! ActiveSet and slider-driven applications are dropped.

use std::collections::HashSet;

use chrono::{Days, NaiveDate, NaiveDateTime};
use log::{debug, info, warn};

use crate::config::RideMapConfig;
use crate::dataset::RideIndex;
use crate::error::{OptionExt, Result};
use crate::events::{EventBus, EventKind, RideMapEvent, SubscriptionId};
use crate::hover::{HighlightChange, HoverController, Key};
use crate::playback::{PlaybackAnimator, PlaybackState, PlaybackStep};
use crate::scale::{DayScale, Scale};
use crate::scheduler::{earliest, Millis, Timed};
use crate::slider::{RangeSlider, SlideCallback, SliderEvent};
use crate::sync::{active_rides, DateWindow, SelectionSynchronizer};
use crate::HandleRole;

/// A point in map screen pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// The map renderer, as seen by the engine.
pub trait MapView {
    /// Render exactly these rides with the "active" treatment.
    fn set_active_rides(&mut self, ids: &HashSet<String>);

    /// Render exactly these rides with the "highlight" treatment.
    fn set_highlighted_rides(&mut self, ids: &HashSet<String>);

    /// Rides drawn within `radius` pixels of `point`, nearest first.
    fn features_near(&self, point: ScreenPoint, radius: f64) -> Vec<String>;
}

/// The ride map coordination engine.
pub struct RideMapEngine<M: MapView> {
    config: RideMapConfig,
    index: RideIndex,
    map: M,
    slider: RangeSlider<DayScale>,
    sync: SelectionSynchronizer,
    hover: HoverController,
    playback: PlaybackAnimator,
    active: HashSet<String>,
    highlight: HashSet<String>,
    events: EventBus,
}

impl<M: MapView> RideMapEngine<M> {
    /// Build the engine and request the initial selection: the last
    /// `initial_window_days` days up to the last ride.
    pub fn new(index: RideIndex, map: M, config: RideMapConfig, now: Millis) -> Result<Self> {
        config.validate()?;

        let scale = DayScale::for_index(&index, config.track_width);
        let end = index.end_date();
        let start = end
            .checked_sub_days(Days::new(config.initial_window_days as u64))
            .unwrap_or(NaiveDate::MIN)
            .max(index.start_date());
        let slider = RangeSlider::with_values(scale, &start, &end);

        let sync = SelectionSynchronizer::new(config.coalesce_delay_ms, config.min_update_interval_ms);
        let playback = PlaybackAnimator::new(index.records().len(), config.playback_step_ms);

        info!(
            "[RideMapEngine] Ready: {} rides over {} days ({} to {})",
            index.records().len(),
            index.len(),
            index.start_date(),
            end
        );

        let mut engine = Self {
            config,
            index,
            map,
            slider,
            sync,
            hover: HoverController::new(),
            playback,
            active: HashSet::new(),
            highlight: HashSet::new(),
            events: EventBus::new(),
        };
        engine.process_slider_events(now);
        Ok(engine)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn config(&self) -> &RideMapConfig {
        &self.config
    }

    pub fn index(&self) -> &RideIndex {
        &self.index
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    pub fn map_mut(&mut self) -> &mut M {
        &mut self.map
    }

    pub fn slider(&self) -> &RangeSlider<DayScale> {
        &self.slider
    }

    /// Current slider window, derived from the handles.
    pub fn selection(&self) -> Option<DateWindow> {
        self.slider
            .selection()
            .map(|(start, end)| DateWindow::new(start, end))
    }

    pub fn active_rides(&self) -> &HashSet<String> {
        &self.active
    }

    pub fn highlighted_rides(&self) -> &HashSet<String> {
        &self.highlight
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.playback.state()
    }

    // ========================================================================
    // Observers
    // ========================================================================

    pub fn subscribe(&mut self, callback: impl FnMut(&RideMapEvent) + 'static) -> SubscriptionId {
        self.events.subscribe(callback)
    }

    pub fn subscribe_kind(
        &mut self,
        kind: EventKind,
        callback: impl FnMut(&RideMapEvent) + 'static,
    ) -> SubscriptionId {
        self.events.subscribe_kind(kind, callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    // ========================================================================
    // Slider input
    // ========================================================================

    /// Move a handle to an absolute track position.
    pub fn update_handle(
        &mut self,
        role: HandleRole,
        position: f64,
        force_propagate: bool,
        now: Millis,
    ) {
        self.slider.update(role, position, force_propagate);
        self.process_slider_events(now);
    }

    pub fn drag_start(&mut self, role: HandleRole) {
        self.slider.drag_start(role);
    }

    pub fn drag(&mut self, role: HandleRole, dx: f64, now: Millis) {
        self.slider.drag(role, dx);
        self.process_slider_events(now);
    }

    pub fn drag_end(&mut self, role: HandleRole, now: Millis) {
        self.slider.drag_end(role);
        self.process_slider_events(now);
    }

    /// Drag the selection marquee; returns false if the move was rejected.
    pub fn drag_selection(&mut self, dx: f64, now: Millis) -> bool {
        let moved = self.slider.drag_selection(dx);
        self.process_slider_events(now);
        moved
    }

    /// Animate the handles to pixel positions. `duration` defaults to the
    /// configured slide duration.
    pub fn slide_to(
        &mut self,
        start: f64,
        end: f64,
        duration: Option<Millis>,
        now: Millis,
        on_complete: Option<SlideCallback>,
    ) {
        let duration = duration.unwrap_or(self.config.slide_duration_ms);
        debug!(
            "[RideMapEngine] Sliding selection to [{}, {}] over {}ms",
            start, end, duration
        );
        self.slider.slide_to(start, end, duration, now, on_complete);
    }

    /// Animate the handles so the selection becomes `[start, end]`.
    pub fn slide_to_dates(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
        duration: Option<Millis>,
        now: Millis,
        on_complete: Option<SlideCallback>,
    ) {
        let scale = self.slider.scale();
        let start_px = scale.scale(&start) - scale.value_offset(HandleRole::Start);
        let end_px = scale.scale(&end) - scale.value_offset(HandleRole::End);
        self.slide_to(start_px, end_px, duration, now, on_complete);
    }

    /// New slider track width. Handle values are kept; only pixels move.
    pub fn resize(&mut self, track_width: f64, now: Millis) {
        self.slider.resize(track_width);
        self.process_slider_events(now);
    }

    /// Select a window coming from outside the slider (e.g. a chart brush).
    ///
    /// Times are floored to midnight and inverted bounds are swapped. Both
    /// handles jump to the window, so the slider, `SelectionChanged` and the
    /// ActiveSet stay in agreement.
    pub fn request_window(&mut self, start: NaiveDateTime, end: NaiveDateTime, now: Millis) {
        let (start, end) = if start > end { (end, start) } else { (start, end) };
        let window = DateWindow::from_datetimes(start, end);
        let scale = self.slider.scale();
        let start_px = scale.scale(&window.start) - scale.value_offset(HandleRole::Start);
        let end_px = scale.scale(&window.end) - scale.value_offset(HandleRole::End);
        debug!(
            "[RideMapEngine] External window {} to {} at [{}, {}]",
            window.start, window.end, start_px, end_px
        );
        self.slider.set_selection(start_px, end_px, true);
        self.process_slider_events(now);
    }

    // ========================================================================
    // Hover and highlight
    // ========================================================================

    pub fn key_down(&mut self, key: Key) {
        self.hover.key_down(key);
    }

    pub fn key_up(&mut self, key: Key) {
        self.hover.key_up(key);
    }

    /// Pointer moved over the map.
    pub fn hover(&mut self, point: ScreenPoint) {
        let features = self
            .map
            .features_near(point, self.config.hover_radius_px);
        if let Some(change) = self.hover.on_hover(&features, &self.active) {
            self.apply_highlight(change);
        }
    }

    /// Union rides into the highlight (e.g. chart-originated).
    pub fn add_highlight(&mut self, names: Vec<String>) {
        self.apply_highlight(HighlightChange::Add(names));
    }

    /// Replace the highlight (e.g. chart-originated).
    pub fn set_highlight(&mut self, names: Vec<String>) {
        self.apply_highlight(HighlightChange::Replace(names));
    }

    fn apply_highlight(&mut self, change: HighlightChange) {
        change.apply_to(&mut self.highlight);
        self.map.set_highlighted_rides(&self.highlight);
        self.events
            .emit(&RideMapEvent::HighlightChanged(self.highlight.clone()));
    }

    // ========================================================================
    // Playback
    // ========================================================================

    /// The Play/Clear button.
    pub fn press_playback(&mut self, now: Millis) {
        self.playback.press(now);
        self.process_playback_steps();
    }

    // ========================================================================
    // Internal plumbing
    // ========================================================================

    fn apply_active(&mut self) {
        // A hover over the same rides must be re-evaluated against the new set
        self.hover.reset_hover();
        self.map.set_active_rides(&self.active);
        self.events
            .emit(&RideMapEvent::ActiveChanged(self.active.clone()));
    }

    fn process_slider_events(&mut self, now: Millis) {
        let mut selection_changed = false;
        for event in self.slider.take_events() {
            match event {
                SliderEvent::ValueChanged { .. } => selection_changed = true,
                SliderEvent::ThumbMoved { role, position } => {
                    self.events
                        .emit(&RideMapEvent::ThumbMoved { role, position });
                }
                SliderEvent::SlideFinished => self.events.emit(&RideMapEvent::SlideFinished),
            }
        }

        if !selection_changed {
            return;
        }
        if let Some(window) = self.selection() {
            self.events.emit(&RideMapEvent::SelectionChanged {
                start: window.start,
                end: window.end,
            });
            self.sync.request(window, now);
        }
    }

    fn process_sync(&mut self) {
        let Some(window) = self.sync.take_ready() else {
            return;
        };
        if self.playback.state() != PlaybackState::Clear {
            debug!(
                "[RideMapEngine] Playback owns the map, dropping window {} to {}",
                window.start, window.end
            );
            return;
        }
        self.active = active_rides(&self.index, window);
        debug!(
            "[RideMapEngine] {} rides active between {} and {}",
            self.active.len(),
            window.start,
            window.end
        );
        self.apply_active();
    }

    fn process_playback_steps(&mut self) {
        for step in self.playback.take_steps() {
            match step {
                PlaybackStep::Activate(i) => {
                    let name = self
                        .index
                        .records()
                        .get(i)
                        .map(|r| r.name.clone())
                        .ok_or_internal("playback cursor past the last ride");
                    match name {
                        Ok(name) => {
                            self.active.insert(name);
                            self.apply_active();
                        }
                        Err(e) => warn!("[RideMapEngine] {}", e),
                    }
                }
                PlaybackStep::ClearAll => {
                    self.active.clear();
                    self.apply_active();
                }
                PlaybackStep::StateChanged(state) => {
                    self.events.emit(&RideMapEvent::PlaybackStateChanged(state));
                }
            }
        }
    }
}

impl<M: MapView> Timed for RideMapEngine<M> {
    fn next_deadline(&self) -> Option<Millis> {
        earliest([
            self.slider.next_deadline(),
            self.sync.next_deadline(),
            self.playback.next_deadline(),
        ])
    }

    fn tick(&mut self, now: Millis) {
        self.slider.tick(now);
        self.process_slider_events(now);

        self.sync.tick(now);
        self.process_sync();

        self.playback.tick(now);
        self.process_playback_steps();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use chrono::Days;

    use super::*;
    use crate::scheduler::run_until;
    use crate::RideRecord;

    #[derive(Default)]
    struct CountingMap {
        active_calls: usize,
    }

    impl MapView for CountingMap {
        fn set_active_rides(&mut self, _ids: &HashSet<String>) {
            self.active_calls += 1;
        }

        fn set_highlighted_rides(&mut self, _ids: &HashSet<String>) {}

        fn features_near(&self, _point: ScreenPoint, _radius: f64) -> Vec<String> {
            Vec::new()
        }
    }

    fn engine() -> RideMapEngine<CountingMap> {
        let start = NaiveDate::from_ymd_opt(2015, 9, 1).unwrap();
        let rides = (0..4u64)
            .map(|i| RideRecord::new(format!("ride-{}", i), start + Days::new(i * 3), 10.0))
            .collect();
        let index = RideIndex::from_records(rides).unwrap();
        RideMapEngine::new(index, CountingMap::default(), RideMapConfig::default(), 0).unwrap()
    }

    #[test]
    fn test_first_deadline_is_coalescer() {
        let engine = engine();
        assert_eq!(engine.next_deadline(), Some(30));
        assert!(engine.active_rides().is_empty());
        assert_eq!(engine.map().active_calls, 0);
    }

    #[test]
    fn test_idle_after_settling() {
        let mut engine = engine();
        run_until(&mut engine, 10_000);
        assert_eq!(engine.next_deadline(), None);
        assert_eq!(engine.map().active_calls, 1);
        assert_eq!(engine.active_rides().len(), 4);
    }

    #[test]
    fn test_unsubscribe_stops_events() {
        let mut engine = engine();
        let count = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&count);
        let id = engine.subscribe(move |_| *counter.borrow_mut() += 1);

        run_until(&mut engine, 10_000);
        let seen = *count.borrow();
        assert!(seen > 0);

        assert!(engine.unsubscribe(id));
        engine.press_playback(10_000);
        assert_eq!(*count.borrow(), seen);
    }

    #[test]
    fn test_playback_ignores_slider_until_cleared() {
        let mut engine = engine();
        run_until(&mut engine, 1_000);

        engine.press_playback(1_000);
        run_until(&mut engine, 2_000);
        assert_eq!(engine.playback_state(), PlaybackState::Complete);
        engine.press_playback(2_000);
        assert!(engine.active_rides().is_empty());

        // Back to Clear: slider moves reach the map again
        engine.update_handle(HandleRole::Start, 0.0, true, 3_000);
        engine.update_handle(HandleRole::End, 400.0, true, 3_000);
        run_until(&mut engine, 4_000);
        assert!(!engine.active_rides().is_empty());
    }
}
