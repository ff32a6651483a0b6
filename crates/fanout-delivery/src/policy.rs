//! Effective delivery policy and backoff arithmetic.
//!
//! Catalog records are written by an external service and may carry
//! out-of-range values, so the dispatcher never uses a stored policy
//! directly: it derives an [`EffectivePolicy`] with every field clamped
//! to its operating range first.

use std::time::Duration;

use fanout_core::models::{Backoff, DeliveryPolicy};

/// Clamp range for the retry count.
pub const RETRIES_RANGE: (u32, u32) = (0, 20);

/// Clamp range for the per-attempt timeout, in milliseconds.
pub const TIMEOUT_MS_RANGE: (u64, u64) = (1_000, 60_000);

/// Clamp range for the auto-disable threshold.
pub const DISABLE_AFTER_FAILURES_RANGE: (u32, u32) = (0, 1_000);

/// Delay for fixed backoff, and the base delay for exponential backoff.
pub const BACKOFF_BASE_MS: u64 = 1_000;

/// Ceiling on any exponential backoff delay.
pub const BACKOFF_CAP_MS: u64 = 15_000;

/// A delivery policy with every field clamped to its operating range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectivePolicy {
    /// Retries after the initial attempt; total attempts = retries + 1.
    pub retries: u32,
    /// Backoff strategy between attempts.
    pub backoff: Backoff,
    /// Per-attempt timeout.
    pub timeout: Duration,
    /// Consecutive sequence failures before auto-disable; 0 disables
    /// the mechanism.
    pub disable_after_failures: u32,
}

impl EffectivePolicy {
    /// Derives the effective policy from a stored one.
    pub fn from_stored(policy: &DeliveryPolicy) -> Self {
        Self {
            retries: policy.retries.clamp(RETRIES_RANGE.0, RETRIES_RANGE.1),
            backoff: policy.backoff,
            timeout: Duration::from_millis(
                policy.timeout_ms.clamp(TIMEOUT_MS_RANGE.0, TIMEOUT_MS_RANGE.1),
            ),
            disable_after_failures: policy
                .disable_after_failures
                .clamp(DISABLE_AFTER_FAILURES_RANGE.0, DISABLE_AFTER_FAILURES_RANGE.1),
        }
    }

    /// Delay to wait after failed attempt `attempt` (zero-based) before
    /// the next one.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let ms = match self.backoff {
            Backoff::Fixed => BACKOFF_BASE_MS,
            Backoff::Exponential => {
                let multiplier = 2_u64.saturating_pow(attempt.min(63));
                BACKOFF_BASE_MS.saturating_mul(multiplier).min(BACKOFF_CAP_MS)
            },
        };
        Duration::from_millis(ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_values_are_clamped() {
        let stored = DeliveryPolicy {
            retries: 100,
            backoff: Backoff::Exponential,
            timeout_ms: 10,
            disable_after_failures: 5_000,
        };

        let policy = EffectivePolicy::from_stored(&stored);
        assert_eq!(policy.retries, 20);
        assert_eq!(policy.timeout, Duration::from_secs(1));
        assert_eq!(policy.disable_after_failures, 1_000);
    }

    #[test]
    fn in_range_values_pass_through() {
        let stored = DeliveryPolicy::default();

        let policy = EffectivePolicy::from_stored(&stored);
        assert_eq!(policy.retries, 3);
        assert_eq!(policy.timeout, Duration::from_millis(5_000));
        assert_eq!(policy.disable_after_failures, 10);
    }

    #[test]
    fn exponential_backoff_doubles_then_caps() {
        let policy = EffectivePolicy {
            retries: 10,
            backoff: Backoff::Exponential,
            timeout: Duration::from_secs(5),
            disable_after_failures: 0,
        };

        let delays: Vec<u64> =
            (0..6).map(|i| policy.backoff_delay(i).as_millis() as u64).collect();
        assert_eq!(delays, vec![1_000, 2_000, 4_000, 8_000, 15_000, 15_000]);
    }

    #[test]
    fn fixed_backoff_is_constant() {
        let policy = EffectivePolicy {
            retries: 5,
            backoff: Backoff::Fixed,
            timeout: Duration::from_secs(5),
            disable_after_failures: 0,
        };

        for attempt in 0..5 {
            assert_eq!(policy.backoff_delay(attempt), Duration::from_millis(1_000));
        }
    }

    #[test]
    fn huge_attempt_index_does_not_overflow() {
        let policy = EffectivePolicy {
            retries: 20,
            backoff: Backoff::Exponential,
            timeout: Duration::from_secs(5),
            disable_after_failures: 0,
        };

        assert_eq!(policy.backoff_delay(u32::MAX), Duration::from_millis(BACKOFF_CAP_MS));
    }
}
