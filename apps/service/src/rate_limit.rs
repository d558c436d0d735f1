use std::{
    collections::HashMap,
    sync::Mutex,
    time::{Duration, Instant},
};

/// Fixed-window hit counter keyed by caller-chosen strings
///
/// Owned by whoever serves requests and shared behind an `Arc`; it lives for
/// as long as that owner does.
#[derive(Debug, Default)]
pub struct RateLimiter {
    windows: Mutex<HashMap<String, Window>>,
}

#[derive(Debug, Clone, Copy)]
struct Window {
    /// Hits counted in the current window
    count: u32,
    /// When the current window stops applying
    reset_at: Instant,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a hit for `key` and report whether it is allowed
    pub fn check(&self, key: &str, limit: u32, window: Duration) -> bool {
        self.check_at(key, limit, window, Instant::now())
    }

    pub fn check_at(&self, key: &str, limit: u32, window: Duration, now: Instant) -> bool {
        // A poisoned map only means another hit panicked mid-update; counts are still usable
        let mut windows = self.windows.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        match windows.get_mut(key) {
            Some(entry) if now <= entry.reset_at => {
                if entry.count >= limit {
                    return false;
                }
                entry.count += 1;
                true
            }
            _ => {
                windows.insert(key.to_string(), Window { count: 1, reset_at: now + window });
                true
            }
        }
    }
}
