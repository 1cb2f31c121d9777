//! Reconnection delay policy.
//!
//! Exponential backoff: `min(base * 2^n, max)` for the n-th retry, with an
//! optional bound on the number of retries.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::connector::ConnectorOptions;

// ============================================================================
// Constants
// ============================================================================

/// Growth factor between consecutive delays.
const FACTOR: u32 = 2;

// ============================================================================
// Backoff
// ============================================================================

/// Tracks reconnection attempts and yields the delay before each one.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    limit: Option<u32>,
    attempts: u32,
}

impl Backoff {
    /// Creates a backoff policy.
    #[inline]
    #[must_use]
    pub const fn new(base: Duration, max: Duration, limit: Option<u32>) -> Self {
        Self {
            base,
            max,
            limit,
            attempts: 0,
        }
    }

    /// Creates the policy described by connector options.
    #[inline]
    #[must_use]
    pub fn from_options(options: &ConnectorOptions) -> Self {
        Self::new(
            options.reconnection_delay,
            options.reconnection_delay_max,
            options.reconnection_attempts,
        )
    }

    /// Returns the delay before the next attempt, or `None` once the
    /// attempt limit is reached.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if let Some(limit) = self.limit
            && self.attempts >= limit
        {
            return None;
        }

        let multiplier = FACTOR.checked_pow(self.attempts).unwrap_or(u32::MAX);
        let delay = self
            .base
            .checked_mul(multiplier)
            .unwrap_or(self.max)
            .min(self.max);

        self.attempts = self.attempts.saturating_add(1);
        Some(delay)
    }

    /// Number of attempts handed out since the last reset.
    #[inline]
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Starts over after a successful connection.
    #[inline]
    pub fn reset(&mut self) {
        self.attempts = 0;
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_growth_with_cap() {
        let mut backoff = Backoff::new(Duration::from_secs(1), Duration::from_secs(5), None);

        assert_eq!(backoff.next_delay(), Some(Duration::from_secs(1)));
        assert_eq!(backoff.next_delay(), Some(Duration::from_secs(2)));
        assert_eq!(backoff.next_delay(), Some(Duration::from_secs(4)));
        assert_eq!(backoff.next_delay(), Some(Duration::from_secs(5)));
        assert_eq!(backoff.next_delay(), Some(Duration::from_secs(5)));
        assert_eq!(backoff.attempts(), 5);
    }

    #[test]
    fn test_bounded_attempts() {
        let mut backoff = Backoff::new(Duration::from_millis(10), Duration::from_secs(1), Some(2));

        assert!(backoff.next_delay().is_some());
        assert!(backoff.next_delay().is_some());
        assert_eq!(backoff.next_delay(), None);
    }

    #[test]
    fn test_reset() {
        let mut backoff = Backoff::new(Duration::from_millis(100), Duration::from_secs(1), Some(1));

        assert!(backoff.next_delay().is_some());
        assert_eq!(backoff.next_delay(), None);

        backoff.reset();
        assert_eq!(backoff.next_delay(), Some(Duration::from_millis(100)));
    }

    #[test]
    fn test_many_attempts_do_not_overflow() {
        let mut backoff = Backoff::new(Duration::from_secs(1), Duration::from_secs(5), None);
        for _ in 0..100 {
            assert!(backoff.next_delay().expect("unbounded") <= Duration::from_secs(5));
        }
    }

    #[test]
    fn test_from_options() {
        let options = ConnectorOptions::new().with_reconnection_attempts(4);
        let mut backoff = Backoff::from_options(&options);
        assert_eq!(backoff.next_delay(), Some(options.reconnection_delay));
    }
}
