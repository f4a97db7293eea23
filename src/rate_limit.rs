use std::{
    collections::HashMap,
    sync::Mutex,
    time::{Duration, Instant},
};

use axum::http::HeaderMap;

/// How many requests a key may make inside one window.
#[derive(Debug, Clone, Copy)]
pub struct RatePolicy {
    pub max_requests: u32,
    pub window: Duration,
}

impl RatePolicy {
    pub const fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
        }
    }
}

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy)]
pub struct Decision {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_at: Instant,
}

impl Decision {
    /// Whole seconds until the window resets, rounded up and never zero,
    /// suitable for a `Retry-After` header.
    pub fn retry_after_secs(&self) -> u64 {
        let left = self.reset_at.saturating_duration_since(Instant::now());
        let secs = left.as_secs() + if left.subsec_nanos() > 0 { 1 } else { 0 };
        secs.max(1)
    }
}

struct Window {
    count: u32,
    reset_at: Instant,
}

/// Fixed-window request counter keyed by client identity.
///
/// State is process-local: every instance of the server counts
/// independently, so effective limits multiply by instance count. Expired
/// windows across all keys are swept on each call, which is O(total keys)
/// and only acceptable at the scale of a login endpoint.
pub struct RateLimiter {
    windows: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn check(&self, key: &str, policy: RatePolicy) -> Decision {
        self.check_at(key, policy, Instant::now())
    }

    fn check_at(&self, key: &str, policy: RatePolicy, now: Instant) -> Decision {
        let mut windows = self
            .windows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        windows.retain(|_, w| w.reset_at > now);

        let window = windows.entry(key.to_string()).or_insert(Window {
            count: 0,
            reset_at: now + policy.window,
        });
        window.count += 1;

        if window.count > policy.max_requests {
            Decision {
                allowed: false,
                remaining: 0,
                reset_at: window.reset_at,
            }
        } else {
            Decision {
                allowed: true,
                remaining: policy.max_requests - window.count,
                reset_at: window.reset_at,
            }
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

/// Derives the rate-limit key from proxy headers, falling back to a shared
/// bucket when no client address is visible.
pub fn client_key(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const POLICY: RatePolicy = RatePolicy::new(3, Duration::from_secs(60));

    #[test]
    fn allows_up_to_the_limit() {
        let limiter = RateLimiter::new();
        let now = Instant::now();

        for expected_remaining in [2, 1, 0] {
            let d = limiter.check_at("10.0.0.1", POLICY, now);
            assert!(d.allowed);
            assert_eq!(d.remaining, expected_remaining);
        }
    }

    #[test]
    fn rejects_over_the_limit() {
        let limiter = RateLimiter::new();
        let now = Instant::now();

        for _ in 0..3 {
            assert!(limiter.check_at("10.0.0.1", POLICY, now).allowed);
        }
        let d = limiter.check_at("10.0.0.1", POLICY, now);
        assert!(!d.allowed);
        assert_eq!(d.remaining, 0);
        assert_eq!(d.reset_at, now + POLICY.window);
    }

    #[test]
    fn window_resets_after_elapse() {
        let limiter = RateLimiter::new();
        let now = Instant::now();

        for _ in 0..4 {
            limiter.check_at("10.0.0.1", POLICY, now);
        }
        assert!(!limiter.check_at("10.0.0.1", POLICY, now).allowed);

        let later = now + POLICY.window + Duration::from_millis(1);
        let d = limiter.check_at("10.0.0.1", POLICY, later);
        assert!(d.allowed);
        assert_eq!(d.remaining, 2);
    }

    #[test]
    fn keys_are_counted_independently() {
        let limiter = RateLimiter::new();
        let now = Instant::now();

        for _ in 0..3 {
            limiter.check_at("10.0.0.1", POLICY, now);
        }
        assert!(!limiter.check_at("10.0.0.1", POLICY, now).allowed);
        assert!(limiter.check_at("10.0.0.2", POLICY, now).allowed);
    }

    #[test]
    fn expired_entries_are_swept() {
        let limiter = RateLimiter::new();
        let now = Instant::now();

        limiter.check_at("a", POLICY, now);
        limiter.check_at("b", POLICY, now);

        let later = now + POLICY.window + Duration::from_secs(1);
        limiter.check_at("c", POLICY, later);

        let windows = limiter.windows.lock().unwrap();
        assert!(!windows.contains_key("a"));
        assert!(!windows.contains_key("b"));
        assert!(windows.contains_key("c"));
    }

    #[test]
    fn key_prefers_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.9, 10.0.0.1".parse().unwrap());
        headers.insert("x-real-ip", "10.0.0.2".parse().unwrap());
        assert_eq!(client_key(&headers), "203.0.113.9");
    }

    #[test]
    fn key_falls_back_to_unknown() {
        assert_eq!(client_key(&HeaderMap::new()), "unknown");
    }
}
