//! # Range Selection Controller
//!
//! Two draggable handles over a shared [`Scale`]. A handle's value is derived
//! from its pixel position on every update and reported only when it
//! changes. The controller never touches the map or the dataset: everything
//! it has to say goes out as a [`SliderEvent`], drained by the owner with
//! [`RangeSlider::take_events`].
//!
//! Each handle carries a positional constraint applied before a new position
//! is committed. The defaults keep `start <= end`; both handles are always
//! clamped to the track on top of that.

use log::debug;

use crate::error::RideMapError;
use crate::scale::Scale;
use crate::scheduler::{Millis, OneShotTimer, Timed};
use crate::HandleRole;

/// Animation frame interval for `slide_to`.
pub const FRAME_MS: Millis = 16;

/// Arguments passed to a handle constraint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstraintInput {
    /// Position the handle was asked to move to
    pub proposed: f64,
    /// Current position of the other handle
    pub partner: f64,
    /// Track bounds `(start, end)` in pixels
    pub track: (f64, f64),
}

/// Positional clamp applied before an update commits.
pub type Constraint = Box<dyn Fn(ConstraintInput) -> f64>;

/// Completion callback of a slide animation.
pub type SlideCallback = Box<dyn FnOnce()>;

/// Observable slider output.
#[derive(Debug, Clone, PartialEq)]
pub enum SliderEvent<V> {
    /// A handle's resolved value changed
    ValueChanged { role: HandleRole, value: V },
    /// A handle moved without the thumb being the source of the move
    /// (animation, resize, window drag); the visual thumb must follow
    ThumbMoved { role: HandleRole, position: f64 },
    /// A `slide_to` animation ran its final frame
    SlideFinished,
}

fn default_constraint(role: HandleRole) -> Constraint {
    match role {
        HandleRole::Start => Box::new(|c: ConstraintInput| c.proposed.min(c.partner)),
        HandleRole::End => Box::new(|c: ConstraintInput| c.proposed.max(c.partner)),
    }
}

/// One endpoint of the range.
pub struct SliderHandle<V> {
    role: HandleRole,
    position: f64,
    value: Option<V>,
    constraint: Constraint,
    drag_origin: Option<(f64, f64)>,
}

impl<V> SliderHandle<V> {
    fn new(role: HandleRole, position: f64) -> Self {
        Self {
            role,
            position,
            value: None,
            constraint: default_constraint(role),
            drag_origin: None,
        }
    }

    pub fn role(&self) -> HandleRole {
        self.role
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn value(&self) -> Option<&V> {
        self.value.as_ref()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag_origin.is_some()
    }
}

impl<V: std::fmt::Debug> std::fmt::Debug for SliderHandle<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SliderHandle")
            .field("role", &self.role)
            .field("position", &self.position)
            .field("value", &self.value)
            .field("dragging", &self.is_dragging())
            .finish()
    }
}

/// Cubic in-out easing, monotonic on [0, 1].
pub fn ease_cubic_in_out(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

struct SlideAnimation {
    from: (f64, f64),
    to: (f64, f64),
    started: Millis,
    duration: Millis,
    frame: OneShotTimer,
    on_complete: Option<SlideCallback>,
}

impl SlideAnimation {
    /// Rounded handle positions at `now` and whether this is the final frame.
    fn positions_at(&self, now: Millis) -> ((f64, f64), bool) {
        let elapsed = now.saturating_sub(self.started);
        let t = if self.duration == 0 {
            1.0
        } else {
            (elapsed as f64 / self.duration as f64).min(1.0)
        };
        let k = ease_cubic_in_out(t);
        let lerp = |a: f64, b: f64| (a + (b - a) * k).round();
        ((lerp(self.from.0, self.to.0), lerp(self.from.1, self.to.1)), t >= 1.0)
    }
}

/// Dual-handle range selector.
pub struct RangeSlider<S: Scale> {
    scale: S,
    start: SliderHandle<S::Value>,
    end: SliderHandle<S::Value>,
    animation: Option<SlideAnimation>,
    events: Vec<SliderEvent<S::Value>>,
}

impl<S: Scale> RangeSlider<S> {
    /// Create a slider with handles at the given pixel positions.
    ///
    /// Both handles are resolved immediately, so the first drained events
    /// carry the initial selection.
    pub fn new(scale: S, start_position: f64, end_position: f64) -> Self {
        let (track_start, track_end) = scale.range();
        let mut slider = Self {
            scale,
            start: SliderHandle::new(HandleRole::Start, track_start),
            end: SliderHandle::new(HandleRole::End, track_end),
            animation: None,
            events: Vec::new(),
        };
        slider.update(HandleRole::End, end_position, true);
        slider.update(HandleRole::Start, start_position, true);
        slider
    }

    /// Create a slider with handles placed on two domain values.
    pub fn with_values(scale: S, start: &S::Value, end: &S::Value) -> Self {
        let start_position = scale.scale(start) - scale.value_offset(HandleRole::Start);
        let end_position = scale.scale(end) - scale.value_offset(HandleRole::End);
        Self::new(scale, start_position, end_position)
    }

    pub fn scale(&self) -> &S {
        &self.scale
    }

    pub fn handle(&self, role: HandleRole) -> &SliderHandle<S::Value> {
        match role {
            HandleRole::Start => &self.start,
            HandleRole::End => &self.end,
        }
    }

    fn handle_mut(&mut self, role: HandleRole) -> &mut SliderHandle<S::Value> {
        match role {
            HandleRole::Start => &mut self.start,
            HandleRole::End => &mut self.end,
        }
    }

    /// Current `(start, end)` values; `None` until both handles resolved.
    pub fn selection(&self) -> Option<(S::Value, S::Value)> {
        Some((self.start.value.clone()?, self.end.value.clone()?))
    }

    /// Pixel bounds of the selection marquee.
    pub fn selection_pixels(&self) -> (f64, f64) {
        (self.start.position, self.end.position)
    }

    /// Replace the positional clamp of one handle.
    pub fn constrain(&mut self, role: HandleRole, constraint: Constraint) {
        self.handle_mut(role).constraint = constraint;
    }

    /// Move a handle, returning its new value if it changed.
    ///
    /// `force_propagate` is set when the move does not originate from the
    /// handle's own thumb; a `ThumbMoved` event then tells the view to follow.
    pub fn update(
        &mut self,
        role: HandleRole,
        position: f64,
        force_propagate: bool,
    ) -> Option<S::Value> {
        if !position.is_finite() {
            debug!("[RangeSlider] Ignoring non-finite {:?} position", role);
            return None;
        }

        let track = self.scale.range();
        let partner = self.handle(role.other()).position;
        let handle = self.handle(role);
        let constrained = (handle.constraint)(ConstraintInput {
            proposed: position,
            partner,
            track,
        });
        let committed = constrained.clamp(track.0, track.1);
        if committed != position {
            debug!(
                "[RangeSlider] {:?}: {}",
                role,
                RideMapError::ConstraintViolation {
                    requested: position,
                    corrected: committed,
                }
            );
        }

        let value = self
            .scale
            .invert(committed + self.scale.value_offset(role));

        let handle = self.handle_mut(role);
        handle.position = committed;
        let changed = handle.value.as_ref() != Some(&value);
        if changed {
            handle.value = Some(value.clone());
        }

        if force_propagate {
            self.events.push(SliderEvent::ThumbMoved {
                role,
                position: committed,
            });
        }
        if changed {
            self.events.push(SliderEvent::ValueChanged {
                role,
                value: value.clone(),
            });
            Some(value)
        } else {
            None
        }
    }

    /// Move both handles, ordering the two updates so that neither is
    /// clamped against the partner's stale position.
    fn update_pair(&mut self, start: f64, end: f64, force_propagate: bool) {
        if start > self.end.position {
            self.update(HandleRole::End, end, force_propagate);
            self.update(HandleRole::Start, start, force_propagate);
        } else {
            self.update(HandleRole::Start, start, force_propagate);
            self.update(HandleRole::End, end, force_propagate);
        }
    }

    /// Place both handles at once, e.g. for a window chosen outside the
    /// slider. Bounds are reordered when inverted and a running slide is
    /// cancelled.
    pub fn set_selection(&mut self, start: f64, end: f64, force_propagate: bool) {
        if self.animation.take().is_some() {
            debug!("[RangeSlider] Selection set during slide animation");
        }
        let (start, end) = if start > end { (end, start) } else { (start, end) };
        self.update_pair(start, end, force_propagate);
    }

    pub fn drag_start(&mut self, role: HandleRole) {
        if self.animation.take().is_some() {
            debug!("[RangeSlider] Drag interrupted slide animation");
        }
        let handle = self.handle_mut(role);
        handle.drag_origin = Some((handle.position, 0.0));
    }

    /// Apply a pointer delta to a dragged handle. Deltas accumulate from the
    /// drag origin, so a handle held back by its partner catches up with the
    /// pointer once the pointer comes back.
    pub fn drag(&mut self, role: HandleRole, dx: f64) -> Option<S::Value> {
        if !dx.is_finite() {
            debug!("[RangeSlider] Ignoring non-finite {:?} drag delta", role);
            return None;
        }
        let handle = self.handle_mut(role);
        let Some((origin, offset)) = handle.drag_origin else {
            return None;
        };
        let offset = offset + dx;
        handle.drag_origin = Some((origin, offset));
        self.update(role, origin + offset, false)
    }

    pub fn drag_end(&mut self, role: HandleRole) -> Option<S::Value> {
        let handle = self.handle_mut(role);
        let (origin, offset) = handle.drag_origin.take()?;
        self.update(role, origin + offset, false)
    }

    /// Drag the whole selection window by `dx`. A move that would push the
    /// window off the track is rejected; returns whether it was applied.
    pub fn drag_selection(&mut self, dx: f64) -> bool {
        let (track_start, track_end) = self.scale.range();
        let (start, end) = self.selection_pixels();
        let new_start = start + dx;
        let new_end = end + dx;
        if !dx.is_finite() || new_start < track_start || new_end > track_end {
            return false;
        }
        self.update_pair(new_start, new_end, true);
        true
    }

    /// Animate both handles to new positions over `duration` ms.
    ///
    /// Every frame updates both handles with `force_propagate`. `on_complete`
    /// runs once, after the final frame; a slide interrupted by another slide
    /// or a drag never completes.
    pub fn slide_to(
        &mut self,
        new_start: f64,
        new_end: f64,
        duration: Millis,
        now: Millis,
        on_complete: Option<SlideCallback>,
    ) {
        let mut frame = OneShotTimer::new();
        frame.arm(now, 0);
        self.animation = Some(SlideAnimation {
            from: self.selection_pixels(),
            to: (new_start, new_end),
            started: now,
            duration,
            frame,
            on_complete,
        });
    }

    pub fn is_sliding(&self) -> bool {
        self.animation.is_some()
    }

    /// Apply a new track width. Positions are re-derived from the current
    /// values, which stay untouched; no `ValueChanged` is emitted.
    pub fn resize(&mut self, track_width: f64) {
        if !track_width.is_finite() || track_width <= 0.0 {
            debug!("[RangeSlider] Ignoring resize to {}", track_width);
            return;
        }
        let (track_start, _) = self.scale.range();
        self.scale.set_range((track_start, track_start + track_width));
        let track = self.scale.range();

        for role in [HandleRole::Start, HandleRole::End] {
            let offset = self.scale.value_offset(role);
            let position = match self.handle(role).value() {
                Some(value) => self.scale.scale(value) - offset,
                None => self.handle(role).position,
            };
            let position = position.clamp(track.0, track.1);
            self.handle_mut(role).position = position;
            self.events.push(SliderEvent::ThumbMoved { role, position });
        }
    }

    /// Drain events produced since the last call.
    pub fn take_events(&mut self) -> Vec<SliderEvent<S::Value>> {
        std::mem::take(&mut self.events)
    }
}

impl<S: Scale> Timed for RangeSlider<S> {
    fn next_deadline(&self) -> Option<Millis> {
        self.animation.as_ref().and_then(|a| a.frame.deadline())
    }

    fn tick(&mut self, now: Millis) {
        let Some(animation) = self.animation.as_mut() else {
            return;
        };
        if !animation.frame.fire_if_due(now) {
            return;
        }
        let ((start, end), finished) = animation.positions_at(now);
        if !finished {
            animation.frame.arm(now, FRAME_MS);
        }

        self.update_pair(start, end, true);

        if finished {
            if let Some(animation) = self.animation.take() {
                if let Some(on_complete) = animation.on_complete {
                    on_complete();
                }
            }
            self.events.push(SliderEvent::SlideFinished);
        }
    }
}
