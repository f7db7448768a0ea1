//! # Selection-to-Highlight Synchronizer
//!
//! Turns a stream of slider windows into a few ActiveSet applications.
//!
//! Two rate limiters run back to back:
//!
//! 1. **Coalescer**: the first request arms a one-shot timer of
//!    `coalesce_delay`. Requests arriving before it fires only overwrite the
//!    pending window. When it fires, the latest window moves on.
//! 2. **Throttle**: an application starts a `min_interval` cooldown. Windows
//!    that come out of the coalescer during the cooldown are held (latest
//!    wins). When the cooldown ends and the held window differs from the
//!    applied one, it is applied right away and a new cooldown starts.
//!
//! Stale windows are dropped, never applied out of order.

use std::collections::HashSet;

use chrono::{NaiveDate, NaiveDateTime};
use log::debug;

use crate::dataset::RideIndex;
use crate::error::RideMapError;
use crate::scheduler::{earliest, Millis, OneShotTimer, Timed};

/// A selected date window, both days inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Window floored to midnight on both ends.
    pub fn from_datetimes(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self::new(start.date(), end.date())
    }
}

/// Names of the rides inside `window`. An inverted window selects nothing.
pub fn active_rides(index: &RideIndex, window: DateWindow) -> HashSet<String> {
    match index.rides_between(window.start, window.end) {
        Ok(names) => names,
        Err(e @ RideMapError::EmptyRange { .. }) => {
            debug!("[Synchronizer] {}, selecting no rides", e);
            HashSet::new()
        }
        Err(e) => {
            debug!("[Synchronizer] Unexpected range error: {}", e);
            HashSet::new()
        }
    }
}

/// Coalescing, throttled window pipeline.
#[derive(Debug, Clone)]
pub struct SelectionSynchronizer {
    coalesce_delay: Millis,
    min_interval: Millis,
    coalesce: OneShotTimer,
    pending: Option<DateWindow>,
    cooldown: OneShotTimer,
    held: Option<DateWindow>,
    applied: Option<DateWindow>,
    ready: Option<DateWindow>,
}

impl SelectionSynchronizer {
    pub fn new(coalesce_delay: Millis, min_interval: Millis) -> Self {
        Self {
            coalesce_delay,
            min_interval,
            coalesce: OneShotTimer::new(),
            pending: None,
            cooldown: OneShotTimer::new(),
            held: None,
            applied: None,
            ready: None,
        }
    }

    /// Ask for a recomputation with `window`. Overwrites any pending window.
    pub fn request(&mut self, window: DateWindow, now: Millis) {
        self.pending = Some(window);
        if self.coalesce.arm_if_idle(now, self.coalesce_delay) {
            debug!(
                "[Synchronizer] Coalescing window opened until {:?}",
                self.coalesce.deadline()
            );
        }
    }

    /// Window to apply now, if the last tick produced one.
    pub fn take_ready(&mut self) -> Option<DateWindow> {
        self.ready.take()
    }

    /// Last window handed out for application.
    pub fn applied(&self) -> Option<DateWindow> {
        self.applied
    }

    pub fn is_idle(&self) -> bool {
        !self.coalesce.is_armed() && !self.cooldown.is_armed() && self.ready.is_none()
    }

    /// Forget everything pending; the next request starts fresh.
    pub fn reset(&mut self) {
        self.coalesce.cancel();
        self.cooldown.cancel();
        self.pending = None;
        self.held = None;
        self.applied = None;
        self.ready = None;
    }

    fn offer(&mut self, window: DateWindow, now: Millis) {
        if self.cooldown.is_armed() {
            self.held = Some(window);
        } else {
            self.apply(window, now);
        }
    }

    fn apply(&mut self, window: DateWindow, now: Millis) {
        self.applied = Some(window);
        self.ready = Some(window);
        self.cooldown.arm(now, self.min_interval);
    }
}

impl Timed for SelectionSynchronizer {
    fn next_deadline(&self) -> Option<Millis> {
        earliest([self.coalesce.deadline(), self.cooldown.deadline()])
    }

    fn tick(&mut self, now: Millis) {
        if self.coalesce.fire_if_due(now) {
            if let Some(window) = self.pending.take() {
                self.offer(window, now);
            }
        }
        if self.cooldown.fire_if_due(now) {
            if let Some(window) = self.held.take() {
                if self.applied != Some(window) {
                    debug!("[Synchronizer] Inputs moved during cooldown, re-applying");
                    self.apply(window, now);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Days;

    use super::*;
    use crate::scheduler::run_until;
    use crate::RideRecord;

    fn day(offset: u64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2016, 4, 10).unwrap() + Days::new(offset)
    }

    fn window(start: u64, end: u64) -> DateWindow {
        DateWindow::new(day(start), day(end))
    }

    /// Run the synchronizer to `until`, collecting every applied window.
    fn drain(sync: &mut SelectionSynchronizer, until: Millis) -> Vec<DateWindow> {
        let mut applied = Vec::new();
        while let Some(deadline) = sync.next_deadline() {
            if deadline > until {
                break;
            }
            sync.tick(deadline);
            applied.extend(sync.take_ready());
        }
        applied
    }

    #[test]
    fn test_burst_is_coalesced() {
        let mut sync = SelectionSynchronizer::new(30, 100);
        for i in 0..50u64 {
            sync.request(window(i % 7, 20), i / 2);
        }
        let applied = drain(&mut sync, 10_000);
        assert_eq!(applied, vec![window(49 % 7, 20)]);
        assert!(sync.is_idle());
    }

    #[test]
    fn test_coalescer_does_not_slide_its_deadline() {
        let mut sync = SelectionSynchronizer::new(30, 0);
        sync.request(window(0, 5), 0);
        sync.request(window(1, 5), 25);
        assert_eq!(sync.next_deadline(), Some(30));
    }

    #[test]
    fn test_throttle_reapplies_latest_after_cooldown() {
        let mut sync = SelectionSynchronizer::new(10, 100);

        sync.request(window(0, 5), 0);
        assert_eq!(drain(&mut sync, 10), vec![window(0, 5)]);

        // Two more coalesced bursts land during the cooldown
        sync.request(window(1, 5), 20);
        assert!(drain(&mut sync, 30).is_empty());
        sync.request(window(2, 5), 40);
        sync.request(window(3, 5), 45);
        assert!(drain(&mut sync, 100).is_empty());

        // Cooldown ends at 110 with only the latest window
        assert_eq!(drain(&mut sync, 110), vec![window(3, 5)]);
        assert_eq!(sync.applied(), Some(window(3, 5)));
        assert_eq!(drain(&mut sync, 10_000), vec![]);
    }

    #[test]
    fn test_throttle_skips_unchanged_window() {
        let mut sync = SelectionSynchronizer::new(10, 100);
        sync.request(window(0, 5), 0);
        drain(&mut sync, 10);

        sync.request(window(0, 5), 20);
        assert!(drain(&mut sync, 10_000).is_empty());
    }

    #[test]
    fn test_reset() {
        let mut sync = SelectionSynchronizer::new(10, 100);
        sync.request(window(0, 5), 0);
        sync.reset();
        assert!(sync.is_idle());
        assert_eq!(run_until(&mut sync, 1_000), 0);
        assert!(sync.take_ready().is_none());
    }

    #[test]
    fn test_active_rides() {
        let rides = vec![
            RideRecord::new("r1", day(0), 10.0),
            RideRecord::new("r2", day(2), 10.0),
            RideRecord::new("r3", day(2), 10.0),
            RideRecord::new("r4", day(5), 10.0),
        ];
        let index = RideIndex::from_records(rides).unwrap();

        let mid = active_rides(&index, window(1, 4));
        assert_eq!(mid.len(), 2);
        assert!(mid.contains("r2") && mid.contains("r3"));
        assert_eq!(active_rides(&index, window(0, 5)).len(), 4);
        // Inverted window: empty, not an error
        assert!(active_rides(&index, window(4, 1)).is_empty());
    }

    #[test]
    fn test_window_from_datetimes_floors() {
        let start = day(1).and_hms_opt(23, 59, 0).unwrap();
        let end = day(3).and_hms_opt(0, 0, 1).unwrap();
        assert_eq!(DateWindow::from_datetimes(start, end), window(1, 3));
    }
}
