//! # Playback Animator
//!
//! Replays the rides one by one for the Play/Clear button:
//!
//! ```text
//!  Clear --press--> Playing --last ride flagged--> Complete --press--> Clear
//! ```
//!
//! Each step is a separate timer tick so the host can render between steps.
//! Flags accumulate during playback; only the final press clears them.

use log::{debug, info};
use serde::Serialize;

use crate::scheduler::{Millis, OneShotTimer, Timed};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlaybackState {
    Clear,
    Playing,
    Complete,
}

impl PlaybackState {
    /// Text of the playback button in this state.
    pub fn button_label(&self) -> &'static str {
        match self {
            PlaybackState::Clear => "Play",
            PlaybackState::Playing => "Playing…",
            PlaybackState::Complete => "Clear",
        }
    }
}

/// Work produced by the animator, drained with `take_steps`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStep {
    StateChanged(PlaybackState),
    /// Flag the ride at this position (dataset order) as active
    Activate(usize),
    /// Remove every active flag
    ClearAll,
}

#[derive(Debug, Clone)]
pub struct PlaybackAnimator {
    state: PlaybackState,
    /// Index of the last flagged ride, -1 before the first step
    cursor: isize,
    ride_count: usize,
    step_delay: Millis,
    timer: OneShotTimer,
    steps: Vec<PlaybackStep>,
    started_at: Millis,
}

impl PlaybackAnimator {
    pub fn new(ride_count: usize, step_delay: Millis) -> Self {
        Self {
            state: PlaybackState::Clear,
            cursor: -1,
            ride_count,
            step_delay,
            timer: OneShotTimer::new(),
            steps: Vec::new(),
            started_at: 0,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn cursor(&self) -> isize {
        self.cursor
    }

    fn set_state(&mut self, state: PlaybackState) {
        self.state = state;
        self.steps.push(PlaybackStep::StateChanged(state));
    }

    /// The Play/Clear button. Ignored while playing.
    pub fn press(&mut self, now: Millis) {
        match self.state {
            PlaybackState::Clear => {
                self.cursor = -1;
                self.started_at = now;
                self.set_state(PlaybackState::Playing);
                if self.ride_count == 0 {
                    self.set_state(PlaybackState::Complete);
                } else {
                    self.timer.arm(now, self.step_delay);
                }
            }
            PlaybackState::Playing => {
                debug!("[Playback] Button pressed while playing, ignored");
            }
            PlaybackState::Complete => {
                self.steps.push(PlaybackStep::ClearAll);
                self.cursor = -1;
                self.set_state(PlaybackState::Clear);
            }
        }
    }

    pub fn take_steps(&mut self) -> Vec<PlaybackStep> {
        std::mem::take(&mut self.steps)
    }
}

impl Timed for PlaybackAnimator {
    fn next_deadline(&self) -> Option<Millis> {
        self.timer.deadline()
    }

    fn tick(&mut self, now: Millis) {
        if !self.timer.fire_if_due(now) || self.state != PlaybackState::Playing {
            return;
        }

        self.cursor += 1;
        self.steps.push(PlaybackStep::Activate(self.cursor as usize));

        if self.cursor as usize + 1 >= self.ride_count {
            info!(
                "[Playback] Played {} rides in {}ms",
                self.ride_count,
                now.saturating_sub(self.started_at)
            );
            self.set_state(PlaybackState::Complete);
        } else {
            self.timer.arm(now, self.step_delay);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::run_until;

    #[test]
    fn test_full_cycle() {
        let mut playback = PlaybackAnimator::new(3, 1);
        assert_eq!(playback.state(), PlaybackState::Clear);
        assert_eq!(playback.state().button_label(), "Play");

        playback.press(0);
        assert_eq!(playback.state(), PlaybackState::Playing);
        assert_eq!(playback.state().button_label(), "Playing…");

        assert_eq!(run_until(&mut playback, 1_000), 3);
        assert_eq!(playback.state(), PlaybackState::Complete);
        assert_eq!(playback.cursor(), 2);
        assert_eq!(
            playback.take_steps(),
            vec![
                PlaybackStep::StateChanged(PlaybackState::Playing),
                PlaybackStep::Activate(0),
                PlaybackStep::Activate(1),
                PlaybackStep::Activate(2),
                PlaybackStep::StateChanged(PlaybackState::Complete),
            ]
        );

        playback.press(1_001);
        assert_eq!(playback.state(), PlaybackState::Clear);
        assert_eq!(playback.cursor(), -1);
        assert_eq!(
            playback.take_steps(),
            vec![
                PlaybackStep::ClearAll,
                PlaybackStep::StateChanged(PlaybackState::Clear)
            ]
        );
    }

    #[test]
    fn test_one_step_per_tick() {
        let mut playback = PlaybackAnimator::new(5, 1);
        playback.press(10);
        assert_eq!(playback.next_deadline(), Some(11));

        playback.tick(11);
        assert_eq!(playback.cursor(), 0);
        assert_eq!(playback.next_deadline(), Some(12));

        // Early tick does nothing
        playback.tick(11);
        assert_eq!(playback.cursor(), 0);
    }

    #[test]
    fn test_press_while_playing_is_ignored() {
        let mut playback = PlaybackAnimator::new(4, 1);
        playback.press(0);
        playback.take_steps();

        playback.press(0);
        assert_eq!(playback.state(), PlaybackState::Playing);
        assert!(playback.take_steps().is_empty());
    }

    #[test]
    fn test_empty_playlist_completes_immediately() {
        let mut playback = PlaybackAnimator::new(0, 1);
        playback.press(0);
        assert_eq!(playback.state(), PlaybackState::Complete);
        assert_eq!(playback.next_deadline(), None);
    }
}
