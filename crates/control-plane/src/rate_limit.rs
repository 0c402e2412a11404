use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

use crate::config::RateLimitConfig;

/// Admission predicate keyed by a caller-supplied client identifier.
pub trait RateLimiter: Send + Sync {
    fn try_acquire(&self, client_id: &str) -> bool;
}

/// Sliding-window limiter. Each client keeps the arrival times of its admitted
/// requests inside the current window, oldest first.
///
/// State is local to this instance; separate processes do not share windows.
#[derive(Clone)]
pub struct InMemoryRateLimiter {
    windows: Arc<Mutex<HashMap<String, VecDeque<i64>>>>,
    config: RateLimitConfig,
}

impl InMemoryRateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            windows: Arc::new(Mutex::new(HashMap::new())),
            config,
        }
    }

    pub fn shared(config: RateLimitConfig) -> Arc<Self> {
        Arc::new(Self::new(config))
    }

    fn now_ms() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as i64
    }

    pub fn check_at(&self, client_id: &str, now_ms: i64) -> bool {
        if !self.config.enabled {
            return true;
        }

        let window_ms = i64::try_from(self.config.window_ms).unwrap_or(i64::MAX);
        let window_start = now_ms.saturating_sub(window_ms);
        let mut windows = self.windows.lock();
        let window = windows.entry(client_id.to_string()).or_default();

        while window.front().is_some_and(|ts| *ts < window_start) {
            window.pop_front();
        }

        if window.len() >= self.config.requests as usize {
            return false;
        }

        window.push_back(now_ms);
        true
    }

    pub fn tracked_clients(&self) -> usize {
        self.windows.lock().len()
    }

    pub fn window_len(&self, client_id: &str) -> usize {
        self.windows
            .lock()
            .get(client_id)
            .map(VecDeque::len)
            .unwrap_or(0)
    }
}

impl RateLimiter for InMemoryRateLimiter {
    fn try_acquire(&self, client_id: &str) -> bool {
        self.check_at(client_id, Self::now_ms())
    }
}
