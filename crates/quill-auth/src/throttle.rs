//! Per-identity login throttling
//!
//! After `free_attempts` consecutive failures an identity is locked for
//! `base_delay * 2^(failures - free_attempts - 1)`, capped at `max_delay`.
//! A successful login clears the record. State lives in this process only.
//!
//! Attempts are claimed with [`LoginThrottle::begin`] before the password is
//! checked. Attempts still in flight count against the free budget, so
//! concurrent guesses cannot get past it.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Throttle settings
#[derive(Debug, Clone)]
pub struct ThrottlePolicy {
    pub enabled: bool,
    pub free_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for ThrottlePolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            free_attempts: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(15 * 60),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct FailureRecord {
    failures: u32,
    /// Attempts claimed but not yet resolved
    pending: u32,
    locked_until: Option<Instant>,
}

impl FailureRecord {
    fn is_idle(&self, now: Instant) -> bool {
        self.pending == 0 && !self.locked_until.is_some_and(|until| until > now)
    }
}

/// Tracks consecutive login failures keyed by normalized email
pub struct LoginThrottle {
    policy: ThrottlePolicy,
    records: Mutex<HashMap<String, FailureRecord>>,
}

/// A claimed login attempt
///
/// Resolve it with [`succeeded`](Self::succeeded) or [`failed`](Self::failed).
/// Dropping it unresolved (an internal error, a cancelled request) releases
/// the claim without counting a failure.
#[must_use = "an unresolved attempt is released without counting"]
pub struct LoginAttempt<'a> {
    throttle: &'a LoginThrottle,
    key: String,
    resolved: bool,
}

impl LoginThrottle {
    pub fn new(policy: ThrottlePolicy) -> Self {
        Self {
            policy,
            records: Mutex::new(HashMap::new()),
        }
    }

    /// Claim an attempt for this identity
    ///
    /// Fails with the time to wait when the identity is locked, or when the
    /// attempts already in flight would use up the free budget.
    pub fn begin(&self, key: &str) -> Result<LoginAttempt<'_>, Duration> {
        self.begin_at(key, Instant::now())
    }

    fn begin_at(&self, key: &str, now: Instant) -> Result<LoginAttempt<'_>, Duration> {
        if self.policy.enabled {
            let mut records = self.records.lock();

            // Bound the table: drop identities with nothing pending or locked
            if records.len() > 10_000 {
                records.retain(|_, r| !r.is_idle(now));
            }

            let record = records.entry(key.to_string()).or_default();

            if let Some(until) = record.locked_until.filter(|until| *until > now) {
                return Err(until - now);
            }

            // Once past the free budget, only one attempt may run per lock period
            let outstanding = record
                .failures
                .min(self.policy.free_attempts)
                .saturating_add(record.pending);
            if outstanding > self.policy.free_attempts {
                return Err(self.delay_for(record.failures.saturating_add(record.pending)));
            }

            record.pending += 1;
        }

        Ok(LoginAttempt {
            throttle: self,
            key: key.to_string(),
            resolved: false,
        })
    }

    fn release(&self, key: &str) {
        let mut records = self.records.lock();
        if let Some(record) = records.get_mut(key) {
            record.pending = record.pending.saturating_sub(1);
            if record.failures == 0 && record.pending == 0 {
                records.remove(key);
            }
        }
    }

    fn succeed(&self, key: &str) {
        let mut records = self.records.lock();
        if let Some(record) = records.get_mut(key) {
            record.pending = record.pending.saturating_sub(1);
            record.failures = 0;
            record.locked_until = None;
            if record.pending == 0 {
                records.remove(key);
            }
        }
    }

    fn fail(&self, key: &str, now: Instant) {
        let mut records = self.records.lock();
        let record = records.entry(key.to_string()).or_default();
        record.pending = record.pending.saturating_sub(1);
        record.failures = record.failures.saturating_add(1);

        if record.failures > self.policy.free_attempts {
            let delay = self.delay_for(record.failures);
            record.locked_until = Some(now + delay);
            if record.failures == self.policy.free_attempts + 1 {
                warn!("Login throttled for {} after {} failures", key, record.failures);
            } else {
                info!("Login lock for {} extended to {:?}", key, delay);
            }
        }
    }

    fn delay_for(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(self.policy.free_attempts + 1);
        let factor = 1u32.checked_shl(exponent).unwrap_or(u32::MAX);
        self.policy
            .base_delay
            .checked_mul(factor)
            .unwrap_or(self.policy.max_delay)
            .min(self.policy.max_delay)
    }
}

impl LoginAttempt<'_> {
    /// The password matched; forget the identity's failures
    pub fn succeeded(mut self) {
        self.resolved = true;
        if self.throttle.policy.enabled {
            self.throttle.succeed(&self.key);
        }
    }

    /// The sign-in was refused; count a failure
    pub fn failed(self) {
        self.failed_at(Instant::now());
    }

    fn failed_at(mut self, now: Instant) {
        self.resolved = true;
        if self.throttle.policy.enabled {
            self.throttle.fail(&self.key, now);
        }
    }
}

impl Drop for LoginAttempt<'_> {
    fn drop(&mut self) {
        if !self.resolved && self.throttle.policy.enabled {
            self.throttle.release(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn throttle() -> LoginThrottle {
        LoginThrottle::new(ThrottlePolicy {
            enabled: true,
            free_attempts: 2,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
        })
    }

    fn fail_times(throttle: &LoginThrottle, key: &str, times: usize, now: Instant) {
        for _ in 0..times {
            throttle.begin_at(key, now).unwrap().failed_at(now);
        }
    }

    #[test]
    fn test_free_attempts_not_locked() {
        let throttle = throttle();
        let now = Instant::now();

        fail_times(&throttle, "a@b.com", 2, now);
        assert!(throttle.begin_at("a@b.com", now).is_ok());
    }

    #[test]
    fn test_lock_grows_exponentially_and_caps() {
        let throttle = throttle();
        let now = Instant::now();

        fail_times(&throttle, "a@b.com", 3, now);
        assert_eq!(throttle.begin_at("a@b.com", now).err(), Some(Duration::from_secs(1)));

        // Each attempt runs once the previous lock has passed
        let mut at = now + Duration::from_secs(1);
        throttle.begin_at("a@b.com", at).unwrap().failed_at(at);
        assert_eq!(throttle.begin_at("a@b.com", at).err(), Some(Duration::from_secs(2)));

        at += Duration::from_secs(2);
        throttle.begin_at("a@b.com", at).unwrap().failed_at(at);
        assert_eq!(throttle.begin_at("a@b.com", at).err(), Some(Duration::from_secs(4)));

        for _ in 0..40 {
            at += Duration::from_secs(10);
            throttle.begin_at("a@b.com", at).unwrap().failed_at(at);
        }
        assert_eq!(throttle.begin_at("a@b.com", at).err(), Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_one_attempt_at_a_time_after_lock_passes() {
        let throttle = throttle();
        let now = Instant::now();
        fail_times(&throttle, "a@b.com", 3, now);

        let later = now + Duration::from_secs(5);
        let attempt = throttle.begin_at("a@b.com", later).unwrap();
        assert!(throttle.begin_at("a@b.com", later).is_err());
        attempt.failed_at(later);
        assert_eq!(throttle.begin_at("a@b.com", later).err(), Some(Duration::from_secs(2)));
    }

    #[test]
    fn test_lock_expires() {
        let throttle = throttle();
        let now = Instant::now();

        fail_times(&throttle, "a@b.com", 3, now);
        assert!(throttle.begin_at("a@b.com", now + Duration::from_secs(2)).is_ok());
    }

    #[test]
    fn test_in_flight_attempts_use_the_budget() {
        let throttle = throttle();
        let now = Instant::now();

        let first = throttle.begin_at("a@b.com", now).unwrap();
        let second = throttle.begin_at("a@b.com", now).unwrap();
        let third = throttle.begin_at("a@b.com", now).unwrap();
        assert!(throttle.begin_at("a@b.com", now).is_err());

        // Other identities are unaffected
        assert!(throttle.begin_at("c@d.com", now).is_ok());

        first.failed_at(now);
        second.failed_at(now);
        third.failed_at(now);
        assert_eq!(throttle.begin_at("a@b.com", now).err(), Some(Duration::from_secs(1)));
    }

    #[test]
    fn test_dropped_attempt_is_released() {
        let throttle = throttle();
        let now = Instant::now();

        for _ in 0..10 {
            drop(throttle.begin_at("a@b.com", now).unwrap());
        }

        let held = throttle.begin_at("a@b.com", now).unwrap();
        assert!(throttle.records.lock().get("a@b.com").is_some_and(|r| r.pending == 1));
        drop(held);
        assert!(throttle.records.lock().is_empty());
    }

    #[test]
    fn test_success_resets() {
        let throttle = throttle();
        let now = Instant::now();

        fail_times(&throttle, "a@b.com", 2, now);
        throttle.begin_at("a@b.com", now).unwrap().succeeded();

        assert!(throttle.records.lock().is_empty());
        fail_times(&throttle, "a@b.com", 2, now);
        assert!(throttle.begin_at("a@b.com", now).is_ok());
    }

    #[test]
    fn test_disabled_never_locks() {
        let throttle = LoginThrottle::new(ThrottlePolicy {
            enabled: false,
            ..ThrottlePolicy::default()
        });
        let now = Instant::now();

        fail_times(&throttle, "a@b.com", 100, now);
        let _held: Vec<_> = (0..100)
            .map(|_| throttle.begin_at("a@b.com", now).unwrap())
            .collect();
        assert!(throttle.begin_at("a@b.com", now).is_ok());
    }
}
