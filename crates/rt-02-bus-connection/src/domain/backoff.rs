//! Exponential reconnect delay with a ceiling.

use std::time::Duration;

/// Floor and ceiling of the reconnect delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub floor: Duration,
    pub ceiling: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            floor: Duration::from_secs(1),
            ceiling: Duration::from_secs(30),
        }
    }
}

/// Doubling delay: floor, 2×floor, 4×floor, … capped at the ceiling.
#[derive(Debug, Clone)]
pub struct Backoff {
    floor: Duration,
    ceiling: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(policy: BackoffPolicy) -> Self {
        let ceiling = policy.ceiling.max(policy.floor);
        Self {
            floor: policy.floor,
            ceiling,
            current: policy.floor,
        }
    }

    /// Return the delay to wait now and advance to the next one.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        let next = self.current.checked_mul(2).unwrap_or(self.ceiling);
        self.current = next.min(self.ceiling);
        delay
    }

    /// Back to the floor. Called on every successful connect.
    pub fn reset(&mut self) {
        self.current = self.floor;
    }

    /// The delay the next failure will wait.
    pub fn peek(&self) -> Duration {
        self.current
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(BackoffPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(values: &[u64]) -> Vec<Duration> {
        values.iter().map(|s| Duration::from_secs(*s)).collect()
    }

    #[test]
    fn test_sequence_is_capped() {
        let mut backoff = Backoff::default();
        let delays: Vec<_> = (0..9).map(|_| backoff.next_delay()).collect();
        assert_eq!(delays, secs(&[1, 2, 4, 8, 16, 30, 30, 30, 30]));
    }

    #[test]
    fn test_reset_returns_to_floor() {
        let mut backoff = Backoff::default();
        for _ in 0..4 {
            backoff.next_delay();
        }
        assert_eq!(backoff.peek(), Duration::from_secs(16));

        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_secs(1));
        assert_eq!(backoff.next_delay(), Duration::from_secs(2));
    }

    #[test]
    fn test_non_decreasing_and_bounded() {
        let mut backoff = Backoff::new(BackoffPolicy {
            floor: Duration::from_millis(300),
            ceiling: Duration::from_secs(5),
        });
        let mut previous = Duration::ZERO;
        for _ in 0..50 {
            let delay = backoff.next_delay();
            assert!(delay >= previous);
            assert!(delay <= Duration::from_secs(5));
            previous = delay;
        }
    }

    #[test]
    fn test_ceiling_below_floor_is_raised() {
        let mut backoff = Backoff::new(BackoffPolicy {
            floor: Duration::from_secs(10),
            ceiling: Duration::from_secs(1),
        });
        assert_eq!(backoff.next_delay(), Duration::from_secs(10));
        assert_eq!(backoff.next_delay(), Duration::from_secs(10));
    }

    #[test]
    fn test_huge_delays_do_not_overflow() {
        let mut backoff = Backoff::new(BackoffPolicy {
            floor: Duration::MAX / 2 + Duration::from_secs(1),
            ceiling: Duration::MAX,
        });
        backoff.next_delay();
        assert_eq!(backoff.next_delay(), Duration::MAX);
    }
}
