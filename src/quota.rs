//! Fixed-window request quotas per client identity.
//!
//! Each quota class guards one metered upstream and owns an hourly and a
//! daily window. A request is admitted only when both windows admit it, and
//! both windows are always consulted, so a request rejected by one window
//! still counts against the other.

use crate::config::QuotaConfig;
use dashmap::DashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

const HOUR: Duration = Duration::from_secs(60 * 60);
const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Expired counters are swept once every this many calls per window.
const PRUNE_INTERVAL: u64 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaClass {
    /// Places search, details and distance matrix traffic
    Places,
    Isoline,
}

impl fmt::Display for QuotaClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuotaClass::Places => write!(f, "places"),
            QuotaClass::Isoline => write!(f, "isoline"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct QuotaCounter {
    count: u32,
    reset_at: Instant,
}

/// Outcome of consuming one unit from a single window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowDecision {
    pub admitted: bool,
    pub remaining: u32,
    pub reset_at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaDecision {
    pub admitted: bool,
    pub hourly: WindowDecision,
    pub daily: WindowDecision,
}

impl QuotaDecision {
    /// Time until the window that rejected the request resets.
    pub fn retry_after(&self, now: Instant) -> Duration {
        let reset_at = match (self.hourly.admitted, self.daily.admitted) {
            (true, false) => self.daily.reset_at,
            (false, true) => self.hourly.reset_at,
            _ => self.hourly.reset_at.max(self.daily.reset_at),
        };
        reset_at.saturating_duration_since(now)
    }
}

pub struct FixedWindow {
    length: Duration,
    limit: u32,
    counters: DashMap<String, QuotaCounter>,
    calls: AtomicU64,
}

impl FixedWindow {
    pub fn new(length: Duration, limit: u32) -> Self {
        FixedWindow {
            length,
            limit,
            counters: DashMap::new(),
            calls: AtomicU64::new(0),
        }
    }

    /// Number of identities currently holding a counter.
    pub fn tracked_identities(&self) -> usize {
        self.counters.len()
    }

    /// Drop counters whose window has ended. Such a counter would be reset
    /// on its next use anyway.
    pub fn prune_expired(&self, now: Instant) {
        let before = self.counters.len();
        self.counters.retain(|_, counter| now < counter.reset_at);
        let removed = before.saturating_sub(self.counters.len());
        if removed > 0 {
            tracing::debug!(removed, "Pruned {} expired quota counters", removed);
        }
    }

    pub fn try_consume_at(&self, identity: &str, now: Instant) -> WindowDecision {
        // Sweep before taking an entry guard; retain locks every shard
        let calls = self.calls.fetch_add(1, Ordering::Relaxed) + 1;
        if calls % PRUNE_INTERVAL == 0 {
            self.prune_expired(now);
        }

        // The entry guard holds the shard lock, so check-and-increment is atomic per identity
        let mut counter = self
            .counters
            .entry(identity.to_string())
            .or_insert(QuotaCounter {
                count: 0,
                reset_at: now,
            });

        if counter.count == 0 || now >= counter.reset_at {
            counter.count = 1;
            counter.reset_at = now + self.length;
            return WindowDecision {
                admitted: true,
                remaining: self.limit.saturating_sub(1),
                reset_at: counter.reset_at,
            };
        }

        if counter.count >= self.limit {
            return WindowDecision {
                admitted: false,
                remaining: 0,
                reset_at: counter.reset_at,
            };
        }

        counter.count += 1;
        WindowDecision {
            admitted: true,
            remaining: self.limit - counter.count,
            reset_at: counter.reset_at,
        }
    }
}

struct WindowPair {
    hourly: FixedWindow,
    daily: FixedWindow,
}

impl WindowPair {
    fn new(hourly_limit: u32, daily_limit: u32) -> Self {
        WindowPair {
            hourly: FixedWindow::new(HOUR, hourly_limit),
            daily: FixedWindow::new(DAY, daily_limit),
        }
    }

    fn try_consume_at(&self, identity: &str, now: Instant) -> QuotaDecision {
        let hourly = self.hourly.try_consume_at(identity, now);
        let daily = self.daily.try_consume_at(identity, now);
        QuotaDecision {
            admitted: hourly.admitted && daily.admitted,
            hourly,
            daily,
        }
    }
}

pub struct QuotaLimiter {
    places: WindowPair,
    isoline: WindowPair,
}

impl QuotaLimiter {
    pub fn new(config: &QuotaConfig) -> Self {
        QuotaLimiter {
            places: WindowPair::new(config.places_hourly_limit, config.places_daily_limit),
            isoline: WindowPair::new(config.isoline_hourly_limit, config.isoline_daily_limit),
        }
    }

    pub fn try_consume(&self, class: QuotaClass, identity: &str) -> QuotaDecision {
        self.try_consume_at(class, identity, Instant::now())
    }

    pub fn try_consume_at(&self, class: QuotaClass, identity: &str, now: Instant) -> QuotaDecision {
        let decision = match class {
            QuotaClass::Places => self.places.try_consume_at(identity, now),
            QuotaClass::Isoline => self.isoline.try_consume_at(identity, now),
        };

        if !decision.admitted {
            tracing::warn!(
                class = %class,
                identity = %identity,
                hourly_remaining = decision.hourly.remaining,
                daily_remaining = decision.daily.remaining,
                "Quota exhausted for {} ({})",
                identity,
                class
            );
        }

        decision
    }
}
