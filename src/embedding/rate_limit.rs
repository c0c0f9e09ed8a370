//! Sliding-window rate limiter.
//!
//! The single serialization point shared by all concurrent embedding
//! calls. Call timestamps are kept in a 60-second window; a caller that
//! finds the window full waits in fixed increments and re-checks until a
//! slot frees. The window check and the timestamp append happen under
//! one lock, so two callers can never both take the last slot.

use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

const WINDOW: Duration = Duration::from_secs(60);
const CHECK_INTERVAL: Duration = Duration::from_millis(600);

/// Shared gate bounding calls per trailing 60-second window.
pub struct RateLimiter {
    max_per_window: usize,
    timestamps: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Create a limiter allowing `max_per_minute` calls per trailing minute.
    pub fn per_minute(max_per_minute: usize) -> Self {
        Self {
            max_per_window: max_per_minute.max(1),
            timestamps: Mutex::new(VecDeque::new()),
        }
    }

    /// Wait for a slot and record this call's timestamp.
    pub async fn acquire(&self) {
        loop {
            {
                let mut stamps = self.timestamps.lock().await;
                let now = Instant::now();

                while let Some(front) = stamps.front() {
                    if now.duration_since(*front) >= WINDOW {
                        stamps.pop_front();
                    } else {
                        break;
                    }
                }

                if stamps.len() < self.max_per_window {
                    stamps.push_back(now);
                    return;
                }
            }

            tokio::time::sleep(CHECK_INTERVAL).await;
        }
    }
}
