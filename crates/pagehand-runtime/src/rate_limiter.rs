//! Sliding-window rate limiter shared by all model calls.

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

/// Default number of calls admitted per window.
pub const DEFAULT_MAX_CALLS: usize = 10;

/// Default window length.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Admits at most `max_calls` calls within any `window`.
///
/// Check-and-record happens under one lock so two concurrent callers can
/// never both take the last slot.
#[derive(Debug)]
pub struct RateLimiter {
    calls: Mutex<VecDeque<Instant>>,
    max_calls: usize,
    window: Duration,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CALLS, DEFAULT_WINDOW)
    }
}

impl RateLimiter {
    pub fn new(max_calls: usize, window: Duration) -> Self {
        Self {
            calls: Mutex::new(VecDeque::with_capacity(max_calls)),
            max_calls,
            window,
        }
    }

    pub fn max_calls(&self) -> usize {
        self.max_calls
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Drop timestamps that have left the window.
    fn evict(&self, calls: &mut VecDeque<Instant>, now: Instant) {
        while let Some(front) = calls.front() {
            if now.duration_since(*front) >= self.window {
                calls.pop_front();
            } else {
                break;
            }
        }
    }

    /// Whether a call would be admitted right now.
    pub fn can_proceed(&self) -> bool {
        let mut calls = self.calls.lock();
        self.evict(&mut calls, Instant::now());
        calls.len() < self.max_calls
    }

    /// Admit and record a call, or return how long until a slot frees up.
    pub fn try_acquire(&self) -> Result<(), Duration> {
        let now = Instant::now();
        let mut calls = self.calls.lock();
        self.evict(&mut calls, now);

        if calls.len() < self.max_calls {
            calls.push_back(now);
            Ok(())
        } else {
            Err(self.wait_from(&calls, now))
        }
    }

    /// Delay until the oldest recorded call exits the window.
    pub fn wait_time(&self) -> Duration {
        let now = Instant::now();
        let mut calls = self.calls.lock();
        self.evict(&mut calls, now);
        if calls.len() < self.max_calls {
            Duration::ZERO
        } else {
            self.wait_from(&calls, now)
        }
    }

    fn wait_from(&self, calls: &VecDeque<Instant>, now: Instant) -> Duration {
        calls
            .front()
            .map(|oldest| self.window.saturating_sub(now.duration_since(*oldest)))
            .unwrap_or(Duration::ZERO)
    }

    /// Calls currently inside the window.
    pub fn count(&self) -> usize {
        let mut calls = self.calls.lock();
        self.evict(&mut calls, Instant::now());
        calls.len()
    }
}
