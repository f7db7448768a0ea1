//! # Scheduler
//!
//! Virtual-time timer primitive shared by every timed component.
//!
//! Components never sleep and never hold callbacks into each other. Each one
//! keeps `OneShotTimer`s, reports its earliest deadline through [`Timed`], and
//! does its work when the host calls `tick(now)`. The host maps
//! `next_deadline()` onto whatever it has (`setTimeout`, an animation frame,
//! a tokio sleep); tests drive time with [`run_until`].

/// Milliseconds on the host's monotonic clock.
pub type Millis = u64;

/// A single pending deadline. Re-arming replaces the previous deadline, so at
/// most one firing is ever outstanding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OneShotTimer {
    deadline: Option<Millis>,
}

impl OneShotTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm (or re-arm) to fire `delay` ms after `now`.
    pub fn arm(&mut self, now: Millis, delay: Millis) {
        self.deadline = Some(now.saturating_add(delay));
    }

    /// Arm only if no deadline is pending. Returns whether it armed.
    pub fn arm_if_idle(&mut self, now: Millis, delay: Millis) -> bool {
        if self.deadline.is_some() {
            return false;
        }
        self.arm(now, delay);
        true
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Millis> {
        self.deadline
    }

    /// Disarm and return true if the deadline has passed.
    pub fn fire_if_due(&mut self, now: Millis) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// Earliest of several optional deadlines.
pub fn earliest(deadlines: impl IntoIterator<Item = Option<Millis>>) -> Option<Millis> {
    deadlines.into_iter().flatten().min()
}

/// Something driven by the host's timer.
pub trait Timed {
    /// Earliest time at which `tick` has work to do.
    fn next_deadline(&self) -> Option<Millis>;

    /// Run everything due at `now`.
    fn tick(&mut self, now: Millis);
}

/// Fire every deadline up to and including `until`, in order, including
/// deadlines armed by earlier ticks. Returns the number of ticks run.
pub fn run_until<T: Timed + ?Sized>(target: &mut T, until: Millis) -> usize {
    let mut ticks = 0;
    while let Some(deadline) = target.next_deadline() {
        if deadline > until {
            break;
        }
        target.tick(deadline);
        ticks += 1;
    }
    ticks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_shot_timer() {
        let mut timer = OneShotTimer::new();
        assert!(!timer.fire_if_due(100));

        timer.arm(10, 30);
        assert_eq!(timer.deadline(), Some(40));
        assert!(!timer.fire_if_due(39));
        assert!(timer.fire_if_due(40));
        assert!(!timer.is_armed());
        assert!(!timer.fire_if_due(41));
    }

    #[test]
    fn test_arm_if_idle_keeps_first_deadline() {
        let mut timer = OneShotTimer::new();
        assert!(timer.arm_if_idle(0, 30));
        assert!(!timer.arm_if_idle(20, 30));
        assert_eq!(timer.deadline(), Some(30));

        timer.cancel();
        assert!(timer.arm_if_idle(20, 30));
        assert_eq!(timer.deadline(), Some(50));
    }

    #[test]
    fn test_earliest() {
        assert_eq!(earliest([None, Some(7), Some(3)]), Some(3));
        assert_eq!(earliest([None, None]), None);
    }

    struct Countdown {
        timer: OneShotTimer,
        remaining: u32,
        fired_at: Vec<Millis>,
    }

    impl Timed for Countdown {
        fn next_deadline(&self) -> Option<Millis> {
            self.timer.deadline()
        }

        fn tick(&mut self, now: Millis) {
            if self.timer.fire_if_due(now) {
                self.fired_at.push(now);
                self.remaining -= 1;
                if self.remaining > 0 {
                    self.timer.arm(now, 5);
                }
            }
        }
    }

    #[test]
    fn test_run_until_follows_rearmed_deadlines() {
        let mut countdown = Countdown {
            timer: OneShotTimer::new(),
            remaining: 4,
            fired_at: Vec::new(),
        };
        countdown.timer.arm(0, 5);

        assert_eq!(run_until(&mut countdown, 12), 2);
        assert_eq!(countdown.fired_at, vec![5, 10]);

        assert_eq!(run_until(&mut countdown, 1_000), 2);
        assert_eq!(countdown.fired_at, vec![5, 10, 15, 20]);
        assert_eq!(countdown.next_deadline(), None);
    }
}
