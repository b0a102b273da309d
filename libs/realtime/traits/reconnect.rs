use std::time::Duration;

/// Trait for defining reconnection strategies
///
/// Consulted after every unclean close with the number of reconnect
/// attempts already made since the last successful open.
pub trait ReconnectionStrategy: Send + Sync {
    /// Get the delay before the next reconnection attempt
    ///
    /// # Arguments
    /// * `attempt` - Attempts already made (0 for the first retry)
    ///
    /// # Returns
    /// * `Some(duration)` - Wait this long before reconnecting
    /// * `None` - Stop reconnecting
    fn next_delay(&self, attempt: usize) -> Option<Duration>;

    /// Check if we should continue reconnecting
    fn should_reconnect(&self, attempt: usize) -> bool;

    /// Attempt cap, if any
    fn max_attempts(&self) -> Option<usize>;
}

/// Fixed delay reconnection strategy
///
/// Always waits the same amount of time between reconnection attempts.
/// The realtime endpoint is retried on a flat interval with no backoff growth.
#[derive(Debug, Clone)]
pub struct FixedDelay {
    delay: Duration,
    max_attempts: Option<usize>,
}

impl FixedDelay {
    /// Create a new fixed delay strategy
    ///
    /// # Arguments
    /// * `delay` - The fixed delay between reconnects
    /// * `max_attempts` - Maximum number of attempts (None = unlimited)
    pub fn new(delay: Duration, max_attempts: Option<usize>) -> Self {
        Self { delay, max_attempts }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl ReconnectionStrategy for FixedDelay {
    fn next_delay(&self, attempt: usize) -> Option<Duration> {
        if !self.should_reconnect(attempt) {
            return None;
        }
        Some(self.delay)
    }

    fn should_reconnect(&self, attempt: usize) -> bool {
        self.max_attempts.map_or(true, |max| attempt < max)
    }

    fn max_attempts(&self) -> Option<usize> {
        self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_delay_is_constant() {
        let strategy = FixedDelay::new(Duration::from_millis(3000), None);
        for attempt in 0..50 {
            assert_eq!(strategy.next_delay(attempt), Some(Duration::from_millis(3000)));
        }
    }

    #[test]
    fn test_fixed_delay_cap() {
        let strategy = FixedDelay::new(Duration::from_millis(100), Some(2));

        assert!(strategy.next_delay(0).is_some());
        assert!(strategy.next_delay(1).is_some());
        assert!(strategy.next_delay(2).is_none());
        assert_eq!(strategy.max_attempts(), Some(2));
    }

    #[test]
    fn test_zero_cap_never_retries() {
        let strategy = FixedDelay::new(Duration::from_millis(100), Some(0));
        assert!(!strategy.should_reconnect(0));
        assert!(strategy.next_delay(0).is_none());
    }
}
