use std::time::Duration;

use web_time::Instant;

/// Deadline-based debounce. Every `schedule` pushes the deadline out to
/// `now + delay`; the action is due once a poll happens at or after it.
///
/// Time is always passed in, so callers (and tests) own the clock.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Restart the quiet period from `now`.
    pub fn schedule(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// True, and disarmed, if the deadline has passed.
    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Disarm and report whether anything was pending, regardless of time.
    pub fn take(&mut self) -> bool {
        self.deadline.take().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_after_quiet_period() {
        let start = Instant::now();
        let mut debounce = Debouncer::new(Duration::from_millis(300));
        debounce.schedule(start);
        assert!(!debounce.fire_if_due(start + Duration::from_millis(299)));
        assert!(debounce.fire_if_due(start + Duration::from_millis(300)));
        assert!(!debounce.fire_if_due(start + Duration::from_millis(900)));
    }

    #[test]
    fn rescheduling_extends_deadline() {
        let start = Instant::now();
        let mut debounce = Debouncer::new(Duration::from_millis(300));
        debounce.schedule(start);
        debounce.schedule(start + Duration::from_millis(200));
        assert!(!debounce.fire_if_due(start + Duration::from_millis(400)));
        assert_eq!(
            debounce.deadline(),
            Some(start + Duration::from_millis(500))
        );
        assert!(debounce.fire_if_due(start + Duration::from_millis(500)));
    }

    #[test]
    fn cancel_disarms() {
        let start = Instant::now();
        let mut debounce = Debouncer::new(Duration::from_millis(10));
        debounce.schedule(start);
        debounce.cancel();
        assert!(!debounce.is_pending());
        assert!(!debounce.fire_if_due(start + Duration::from_secs(1)));
        assert!(!debounce.take());
    }
}
