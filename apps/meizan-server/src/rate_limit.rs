//! Fixed-window admission control keyed by caller identity.
//!
//! The trait is the stable contract; the in-process map behind it is an
//! accepted MVP limitation (state resets on restart, each instance
//! counts independently). A multi-instance deployment would back the
//! same trait with a shared counter store.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

pub const WINDOW: Duration = Duration::from_secs(60);
pub const MAX_REQUESTS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_in: Duration,
}

pub trait RateLimiter: Send + Sync {
    /// Check-and-increment as one logical operation: two concurrent
    /// calls for the same key must never both observe pre-increment
    /// counts and both pass the limit.
    fn check(&self, key: &str, now: Instant) -> RateDecision;
}

struct Entry {
    count: u32,
    reset_at: Instant,
}

#[derive(Default)]
pub struct InMemoryRateLimiter {
    entries: Mutex<HashMap<String, Entry>>,
}

impl RateLimiter for InMemoryRateLimiter {
    fn check(&self, key: &str, now: Instant) -> RateDecision {
        let mut map = self.entries.lock();
        // Opportunistic pruning keeps the map bounded by active keys.
        map.retain(|_, e| now < e.reset_at);
        let entry = map.entry(key.to_string()).or_insert(Entry {
            count: 0,
            reset_at: now + WINDOW,
        });
        let reset_in = entry.reset_at.saturating_duration_since(now);
        if entry.count >= MAX_REQUESTS {
            return RateDecision {
                allowed: false,
                remaining: 0,
                reset_in,
            };
        }
        entry.count += 1;
        RateDecision {
            allowed: true,
            remaining: MAX_REQUESTS - entry.count,
            reset_in,
        }
    }
}
