use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Decides when the player's state is due for a refresh.
///
/// Wall-clock time is cut into quanta of `interval`. A refresh is due once per quantum; every
/// refresh that happens within the same quantum (periodic, forced by a position read, or
/// following a command) is coalesced into one.
#[derive(Debug, Clone, Copy)]
pub struct PollScheduler {
    interval: Duration,
    last_quantum: Option<u128>,
}

impl PollScheduler {
    /// Create a scheduler with the given time quantum.
    ///
    /// A zero interval is bumped to one millisecond.
    pub fn new(interval: Duration) -> Self {
        PollScheduler {
            interval: interval.max(Duration::from_millis(1)),
            last_quantum: None,
        }
    }

    /// Returns the time quantum.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// `true` if no refresh has been recorded for the quantum `now` falls into.
    pub fn is_due(&self, now: SystemTime) -> bool {
        match self.last_quantum {
            None => true,
            Some(last) => self.quantum(now) > last,
        }
    }

    /// Record that a refresh happened at `now`.
    pub fn mark(&mut self, now: SystemTime) {
        self.last_quantum = Some(self.quantum(now));
    }

    /// Returns `true` and records the refresh if one is due at `now`.
    pub fn poll(&mut self, now: SystemTime) -> bool {
        let due = self.is_due(now);
        if due {
            self.mark(now);
        }
        due
    }

    /// How long until the next quantum starts.
    pub fn until_next(&self, now: SystemTime) -> Duration {
        let interval = self.interval.as_nanos();
        let into_quantum = since_epoch(now).as_nanos() % interval;
        let remaining = interval - into_quantum;
        Duration::from_nanos(u64::try_from(remaining).unwrap_or(u64::MAX))
    }

    fn quantum(&self, now: SystemTime) -> u128 {
        since_epoch(now).as_nanos() / self.interval.as_nanos()
    }
}

fn since_epoch(now: SystemTime) -> Duration {
    now.duration_since(UNIX_EPOCH).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(millis: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_millis(millis)
    }

    #[test]
    fn it_is_due_before_the_first_refresh() {
        let scheduler = PollScheduler::new(Duration::from_secs(1));
        assert!(scheduler.is_due(at(10_500)));
    }

    #[test]
    fn it_coalesces_refreshes_within_a_quantum() {
        let mut scheduler = PollScheduler::new(Duration::from_secs(1));
        assert!(scheduler.poll(at(10_100)));
        assert!(!scheduler.poll(at(10_200)));
        assert!(!scheduler.poll(at(10_999)));
        assert!(scheduler.poll(at(11_000)));
    }

    #[test]
    fn it_counts_whole_quanta_not_elapsed_time() {
        let mut scheduler = PollScheduler::new(Duration::from_secs(1));
        scheduler.mark(at(10_900));
        // only 200ms passed, but a new second started
        assert!(scheduler.is_due(at(11_100)));
    }

    #[test]
    fn it_computes_the_time_until_the_next_quantum() {
        let scheduler = PollScheduler::new(Duration::from_secs(1));
        assert_eq!(scheduler.until_next(at(10_250)), Duration::from_millis(750));
        assert_eq!(scheduler.until_next(at(11_000)), Duration::from_secs(1));
    }

    #[test]
    fn it_never_uses_a_zero_interval() {
        let scheduler = PollScheduler::new(Duration::ZERO);
        assert_eq!(scheduler.interval(), Duration::from_millis(1));
    }

    #[test]
    fn it_copies_without_sharing_refresh_state() {
        let scheduler = PollScheduler::new(Duration::from_secs(1));
        let mut copy = scheduler;
        copy.mark(at(10_500));
        assert!(!copy.is_due(at(10_600)));
        assert!(scheduler.is_due(at(10_600)));
    }
}
