//! Per-user admission control for callers of the resolution pipeline.
//!
//! Fixed-window counter: each user gets `MAX_REQUESTS` per window. This is
//! a caller-side concern — the resolver itself is safe at any concurrency —
//! so the limiter ships as a standalone utility the bot/web layers consult
//! before invoking `resolve`.

use crate::core::config;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct Window {
    started: Instant,
    count: u32,
}

/// Fixed-window per-user request limiter.
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    windows: Mutex<HashMap<u64, Window>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(config::rate_limit::MAX_REQUESTS, config::rate_limit::window())
    }
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Try to admit a request for `user_id`. Returns false when the user
    /// has exhausted the current window.
    pub fn check(&self, user_id: u64) -> bool {
        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();

        let entry = windows.entry(user_id).or_insert(Window { started: now, count: 0 });
        if now.duration_since(entry.started) >= self.window {
            entry.started = now;
            entry.count = 0;
        }

        if entry.count >= self.max_requests {
            return false;
        }
        entry.count += 1;
        true
    }

    /// Seconds until the user's window resets (0 when not limited).
    pub fn retry_after_secs(&self, user_id: u64) -> u64 {
        let windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        match windows.get(&user_id) {
            Some(entry) if entry.count >= self.max_requests => {
                let elapsed = entry.started.elapsed();
                self.window.saturating_sub(elapsed).as_secs()
            }
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admits_up_to_limit() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        assert!(limiter.check(1));
        assert!(limiter.check(1));
        assert!(limiter.check(1));
        assert!(!limiter.check(1));
    }

    #[test]
    fn test_users_are_independent() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        assert!(limiter.check(1));
        assert!(!limiter.check(1));
        assert!(limiter.check(2));
    }

    #[test]
    fn test_window_resets() {
        let limiter = RateLimiter::new(1, Duration::from_millis(20));
        assert!(limiter.check(1));
        assert!(!limiter.check(1));
        std::thread::sleep(Duration::from_millis(30));
        assert!(limiter.check(1));
    }

    #[test]
    fn test_retry_after_reported_only_when_limited() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        assert_eq!(limiter.retry_after_secs(1), 0);
        limiter.check(1);
        limiter.check(1); // now limited
        assert!(limiter.retry_after_secs(1) > 0);
    }
}
