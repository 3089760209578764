//! Bounded-retry policy for dispatching to the destination.

use std::time::Duration;

use feedrelay_core::constants::MAX_RELAY_ATTEMPTS;

/// Retry budget for one dispatch. Once initiated, a dispatch either
/// succeeds or exhausts its attempts; there is no mid-retry cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Hard attempt ceiling.
    pub max_attempts: u32,
    /// Base delay between attempts; grows linearly with the attempt
    /// number.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_RELAY_ATTEMPTS,
            backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the given (1-based) failed attempt.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff * attempt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_protocol_budget() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.backoff_for(1), Duration::from_millis(500));
        assert_eq!(policy.backoff_for(2), Duration::from_millis(1000));
    }
}
