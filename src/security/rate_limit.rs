//! Per-client upload quota.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::config::RateLimitConfig;
use crate::upload::types::ClientIdentity;

/// Checks between sweeps of fully expired identities.
const PURGE_EVERY: u64 = 1024;

/// Result of a quota check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    /// Quota used up; a slot frees after `retry_after`.
    Denied { retry_after: Duration },
}

impl Admission {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Admission::Allowed)
    }
}

/// A store of per-client attempt state.
///
/// Implementations synchronize internally; one instance is shared by all
/// request handlers and passed explicitly to the upload pipeline.
pub trait RateLimiter: Send + Sync {
    /// Record an attempt by `identity` at `now` if it fits the quota.
    fn admit(&self, identity: &ClientIdentity, now: Instant) -> Admission;
}

/// Sliding log limiter: at most `max_attempts` admitted attempts in any
/// `window`-long interval.
///
/// Denied attempts are not recorded, so a client is admitted again as soon
/// as its oldest admitted attempt leaves the window.
pub struct SlidingWindowLimiter {
    attempts: DashMap<ClientIdentity, VecDeque<Instant>>,
    window: Duration,
    max_attempts: usize,
    checks: AtomicU64,
}

impl SlidingWindowLimiter {
    pub fn new(window: Duration, max_attempts: u32) -> Self {
        Self {
            attempts: DashMap::new(),
            window,
            max_attempts: max_attempts as usize,
            checks: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(Duration::from_millis(config.window_ms), config.max_attempts)
    }

    /// Number of identities currently tracked.
    pub fn tracked(&self) -> usize {
        self.attempts.len()
    }

    /// Drop identities whose every attempt has left the window.
    pub fn purge_expired(&self, now: Instant) {
        let window = self.window;
        self.attempts.retain(|_, log| {
            log.back()
                .is_some_and(|last| now.saturating_duration_since(*last) < window)
        });
    }

    fn check(&self, identity: &ClientIdentity, now: Instant) -> Admission {
        let mut log = self.attempts.entry(identity.clone()).or_default();

        while let Some(oldest) = log.front() {
            if now.saturating_duration_since(*oldest) >= self.window {
                log.pop_front();
            } else {
                break;
            }
        }

        if log.len() < self.max_attempts {
            log.push_back(now);
            Admission::Allowed
        } else {
            let oldest = log.front().copied().unwrap_or(now);
            Admission::Denied {
                retry_after: self.window.saturating_sub(now.saturating_duration_since(oldest)),
            }
        }
    }
}

impl RateLimiter for SlidingWindowLimiter {
    fn admit(&self, identity: &ClientIdentity, now: Instant) -> Admission {
        let admission = self.check(identity, now);

        // The entry guard is released; sweeping now cannot deadlock on its shard.
        if self.checks.fetch_add(1, Ordering::Relaxed) % PURGE_EVERY == PURGE_EVERY - 1 {
            self.purge_expired(now);
        }

        admission
    }
}

/// Limiter used when rate limiting is disabled.
#[derive(Debug, Default)]
pub struct UnlimitedLimiter;

impl RateLimiter for UnlimitedLimiter {
    fn admit(&self, _identity: &ClientIdentity, _now: Instant) -> Admission {
        Admission::Allowed
    }
}
