//! Fixed-window request budget shared by every clone of an [`HttpClient`](super::HttpClient).

use log::debug;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};

pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug)]
struct WindowState {
    remaining: u32,
    limit: u32,
    window: Duration,
    reset_at: Instant,
}

impl WindowState {
    fn reset(&mut self, now: Instant) {
        self.remaining = self.limit;
        self.reset_at = now + self.window;
    }
}

/// Point-in-time view of the limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitSnapshot {
    pub remaining: u32,
    pub limit: u32,
    pub resets_in: Duration,
}

impl RateLimitSnapshot {
    pub fn reset_at(&self) -> chrono::DateTime<chrono::Utc> {
        chrono::Utc::now()
            + chrono::Duration::from_std(self.resets_in).unwrap_or_else(|_| chrono::Duration::zero())
    }
}

/// Check, optional wait and decrement all happen under one lock, so
/// concurrent callers never push `remaining` below zero. The lock is held
/// across the wait-for-reset sleep; later callers queue behind it.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    state: Arc<Mutex<WindowState>>,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        let limit = limit.max(1);
        Self {
            state: Arc::new(Mutex::new(WindowState {
                remaining: limit,
                limit,
                window,
                reset_at: Instant::now() + window,
            })),
        }
    }

    pub fn per_minute(limit: u32) -> Self {
        Self::new(limit, DEFAULT_WINDOW)
    }

    /// Takes one unit of budget, suspending until the window resets when
    /// none is left. Returns how long the caller waited.
    pub async fn acquire(&self) -> Duration {
        let mut state = self.state.lock().await;
        let now = Instant::now();
        if now >= state.reset_at {
            state.reset(now);
        }

        let mut waited = Duration::ZERO;
        if state.remaining == 0 {
            let until = state.reset_at;
            waited = until.saturating_duration_since(now);
            debug!(
                "rate limit of {} per {:?} reached, waiting {:?}",
                state.limit, state.window, waited
            );
            sleep_until(until).await;
            state.reset(Instant::now());
        }

        state.remaining -= 1;
        waited
    }

    pub async fn snapshot(&self) -> RateLimitSnapshot {
        let state = self.state.lock().await;
        let now = Instant::now();
        if now >= state.reset_at {
            // Window already expired; the next acquire will see a full budget.
            return RateLimitSnapshot {
                remaining: state.limit,
                limit: state.limit,
                resets_in: Duration::ZERO,
            };
        }
        RateLimitSnapshot {
            remaining: state.remaining,
            limit: state.limit,
            resets_in: state.reset_at - now,
        }
    }
}
