//! Exponential reconnect backoff.

// Layer 1: Standard library imports
use std::time::Duration;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
// (none)

/// Exponential delay schedule for stream re-establishment.
///
/// `delay = base * 2^min(attempt, 10)`, capped at `max`. The attempt counter
/// resets once a connection is re-established, so a later outage starts from
/// the base delay again.
///
/// # Example
/// ```rust
/// use strand_rt::transport::ReconnectBackoff;
/// use std::time::Duration;
///
/// let mut backoff = ReconnectBackoff::new(
///     Duration::from_millis(100),
///     Duration::from_secs(5),
/// );
/// assert_eq!(backoff.next_delay(), Duration::from_millis(100));
/// assert_eq!(backoff.next_delay(), Duration::from_millis(200));
/// ```
#[derive(Debug, Clone)]
pub struct ReconnectBackoff {
    base_delay: Duration,
    max_delay: Duration,
    attempt: u32,
}

impl ReconnectBackoff {
    /// Create a schedule with the given base and cap.
    pub fn new(base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            base_delay,
            max_delay,
            attempt: 0,
        }
    }

    /// The delay to sleep before the next attempt; advances the counter.
    pub fn next_delay(&mut self) -> Duration {
        // Exponent capped at 10 to avoid overflow.
        let exponent = self.attempt.min(10);
        self.attempt = self.attempt.saturating_add(1);
        let delay = self.base_delay.saturating_mul(1u32 << exponent);
        delay.min(self.max_delay)
    }

    /// Attempts made since the last reset.
    pub fn attempts(&self) -> u32 {
        self.attempt
    }

    /// Reset after a successful reconnect.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_growth() {
        let mut backoff =
            ReconnectBackoff::new(Duration::from_millis(100), Duration::from_secs(60));
        assert_eq!(backoff.next_delay(), Duration::from_millis(100));
        assert_eq!(backoff.next_delay(), Duration::from_millis(200));
        assert_eq!(backoff.next_delay(), Duration::from_millis(400));
        assert_eq!(backoff.attempts(), 3);
    }

    #[test]
    fn test_cap_applies() {
        let mut backoff =
            ReconnectBackoff::new(Duration::from_millis(100), Duration::from_millis(250));
        backoff.next_delay();
        backoff.next_delay();
        assert_eq!(backoff.next_delay(), Duration::from_millis(250));
        assert_eq!(backoff.next_delay(), Duration::from_millis(250));
    }

    #[test]
    fn test_reset_restarts_schedule() {
        let mut backoff =
            ReconnectBackoff::new(Duration::from_millis(100), Duration::from_secs(60));
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();
        assert_eq!(backoff.attempts(), 0);
        assert_eq!(backoff.next_delay(), Duration::from_millis(100));
    }

    #[test]
    fn test_exponent_capped() {
        let mut backoff = ReconnectBackoff::new(Duration::from_millis(1), Duration::from_secs(600));
        for _ in 0..40 {
            backoff.next_delay();
        }
        // 1ms * 2^10 = ~1s; stays finite well past 10 attempts.
        assert_eq!(backoff.next_delay(), Duration::from_millis(1024));
    }
}
