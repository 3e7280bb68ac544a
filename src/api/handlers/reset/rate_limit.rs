//! Rate limiting for the reset endpoints.
//!
//! Policy is a rolling window per source IP: a request is allowed if fewer
//! than `max` requests were made in the last `window`. Counting is in-memory
//! per process; a multi-instance deployment would move this behind the trait.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Limited,
}

pub trait RateLimiter: Send + Sync {
    fn check_ip(&self, ip: Option<&str>) -> RateLimitDecision;
}

#[derive(Clone, Debug)]
pub struct NoopRateLimiter;

impl RateLimiter for NoopRateLimiter {
    fn check_ip(&self, _ip: Option<&str>) -> RateLimitDecision {
        RateLimitDecision::Allowed
    }
}

/// Rolling-window counter keyed by client IP.
pub struct SlidingWindowLimiter {
    window: Duration,
    max: u32,
    hits: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl SlidingWindowLimiter {
    #[must_use]
    pub fn new(window: Duration, max: u32) -> Self {
        Self {
            window,
            max,
            hits: Mutex::new(HashMap::new()),
        }
    }
}

impl RateLimiter for SlidingWindowLimiter {
    fn check_ip(&self, ip: Option<&str>) -> RateLimitDecision {
        // Requests without a resolvable client IP are not counted; the
        // reverse proxy in front of the service always sets one.
        let Some(ip) = ip else {
            return RateLimitDecision::Allowed;
        };

        let now = Instant::now();
        let mut hits = self
            .hits
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        // Sweep aged hits and drop drained buckets on every check; the map
        // only ever holds sources seen within the current window.
        hits.retain(|_, bucket| {
            while bucket
                .front()
                .is_some_and(|hit| now.duration_since(*hit) >= self.window)
            {
                bucket.pop_front();
            }
            !bucket.is_empty()
        });

        if hits.get(ip).map_or(0, VecDeque::len) >= self.max as usize {
            return RateLimitDecision::Limited;
        }

        hits.entry(ip.to_string()).or_default().push_back(now);
        RateLimitDecision::Allowed
    }
}
