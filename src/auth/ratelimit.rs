//! Fixed-window request limiter keyed by client address and route group.
//!
//! Admission and counting happen under one lock, so concurrent requests
//! against the same window cannot both take the last slot.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::config::RateLimitConfig;

/// Routes sharing one admission quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteGroup {
    Register,
    Login,
    Payments,
    Global,
}

/// Counter for one (client, group) pair inside the current window.
#[derive(Debug)]
struct WindowEntry {
    count: u32,
    window_start: Instant,
}

pub struct RateLimiter {
    config: RateLimitConfig,
    windows: Mutex<HashMap<(IpAddr, RouteGroup), WindowEntry>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: Mutex::new(HashMap::new()),
        }
    }

    const fn group_limit(&self, group: RouteGroup) -> (u32, Duration) {
        match group {
            RouteGroup::Register => (self.config.register_per_minute, Duration::from_secs(60)),
            RouteGroup::Login => (self.config.login_per_minute, Duration::from_secs(60)),
            RouteGroup::Payments => (self.config.payments_per_minute, Duration::from_secs(60)),
            RouteGroup::Global => (self.config.global_per_second, Duration::from_secs(1)),
        }
    }

    /// Admit or reject one request against the group's window.
    /// Rejected requests do not consume quota.
    pub fn admit(&self, client: IpAddr, group: RouteGroup) -> bool {
        self.admit_at(client, group, Instant::now())
    }

    fn admit_at(&self, client: IpAddr, group: RouteGroup, now: Instant) -> bool {
        let (limit, window) = self.group_limit(group);

        let mut windows = self.windows.lock().unwrap();
        let entry = windows.entry((client, group)).or_insert(WindowEntry {
            count: 0,
            window_start: now,
        });

        // Window expired, start a fresh one
        if now.duration_since(entry.window_start) >= window {
            entry.count = 0;
            entry.window_start = now;
        }

        if entry.count >= limit {
            return false;
        }

        entry.count += 1;
        true
    }

    /// Drop windows that have already expired.
    ///
    /// Should be called periodically to free memory
    pub fn cleanup(&self) {
        let now = Instant::now();
        let mut windows = self.windows.lock().unwrap();

        windows.retain(|&(_, group), entry| {
            let (_, window) = self.group_limit(group);
            now.duration_since(entry.window_start) < window
        });
    }

    /// Get current number of tracked windows
    #[must_use]
    pub fn tracked_windows(&self) -> usize {
        self.windows.lock().unwrap().len()
    }
}
