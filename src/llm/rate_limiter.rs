use crate::llm::types::RateLimitConfig;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

/// Rolling-window request limiter shared by every dispatch.
///
/// Successful requests leave a timestamp in the log; at most
/// `max_requests` timestamps (plus in-flight reservations) may fall inside
/// the trailing window. Checking for a free slot and reserving it happen
/// under one lock, so concurrent callers cannot jointly exceed the quota.
#[derive(Debug)]
pub struct SlidingWindowLimiter {
    config: RateLimitConfig,
    state: Mutex<WindowState>,
    released: Notify,
}

#[derive(Debug, Default)]
struct WindowState {
    timestamps: VecDeque<Instant>,
    in_flight: usize,
}

impl WindowState {
    fn prune(&mut self, now: Instant, window: Duration) {
        while let Some(oldest) = self.timestamps.front() {
            if now.saturating_duration_since(*oldest) >= window {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }
    }

    fn occupied(&self) -> usize {
        self.timestamps.len() + self.in_flight
    }
}

/// A reserved slot in the window.
///
/// [`RatePermit::commit`] records the request timestamp. Dropping the permit
/// without committing frees the slot, so failed calls consume no quota.
#[must_use = "dropping a permit immediately releases its slot"]
#[derive(Debug)]
pub struct RatePermit<'a> {
    limiter: &'a SlidingWindowLimiter,
    pub permit_id: Uuid,
    pub granted_at: Instant,
    settled: bool,
}

impl RatePermit<'_> {
    pub fn commit(mut self) {
        self.settled = true;
        let mut state = self.limiter.lock_state();
        state.in_flight = state.in_flight.saturating_sub(1);
        state.timestamps.push_back(Instant::now());
        drop(state);
        self.limiter.released.notify_waiters();
    }
}

impl Drop for RatePermit<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut state = self.limiter.lock_state();
        state.in_flight = state.in_flight.saturating_sub(1);
        drop(state);
        self.limiter.released.notify_waiters();
        debug!(permit_id = %self.permit_id, "Released uncommitted rate permit");
    }
}

/// Point-in-time view of the limiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimiterStatus {
    pub recorded: usize,
    pub in_flight: usize,
    pub available: usize,
    pub next_slot_in: Option<Duration>,
}

enum Wait {
    Until(Duration),
    ForRelease,
}

impl SlidingWindowLimiter {
    pub fn new(mut config: RateLimitConfig) -> Self {
        if config.max_requests == 0 {
            warn!("Rate limit of 0 requests per window would never admit a request; using 1");
            config.max_requests = 1;
        }

        Self {
            config,
            state: Mutex::new(WindowState::default()),
            released: Notify::new(),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Waits until one more request fits in the window and reserves it.
    pub async fn acquire(&self) -> RatePermit<'_> {
        loop {
            let notified = self.released.notified();
            tokio::pin!(notified);

            let wait = {
                let mut state = self.lock_state();
                let now = Instant::now();
                state.prune(now, self.config.window);

                if state.occupied() < self.config.max_requests {
                    state.in_flight += 1;
                    return RatePermit {
                        limiter: self,
                        permit_id: Uuid::new_v4(),
                        granted_at: now,
                        settled: false,
                    };
                }

                // Registered before unlocking so a release in between is not lost.
                notified.as_mut().enable();
                match state.timestamps.front() {
                    Some(oldest) => Wait::Until(
                        self.config
                            .window
                            .saturating_sub(now.saturating_duration_since(*oldest)),
                    ),
                    None => Wait::ForRelease,
                }
            };

            match wait {
                Wait::Until(delay) => {
                    debug!(
                        delay_ms = delay.as_millis() as u64,
                        max_requests = self.config.max_requests,
                        "Rate limit reached, waiting for the oldest request to age out"
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = &mut notified => {}
                    }
                }
                Wait::ForRelease => {
                    debug!("Rate limit reached by in-flight requests, waiting for a release");
                    notified.await;
                }
            }
        }
    }

    /// Number of request timestamps still inside the window.
    pub fn recorded(&self) -> usize {
        let mut state = self.lock_state();
        state.prune(Instant::now(), self.config.window);
        state.timestamps.len()
    }

    pub fn status(&self) -> RateLimiterStatus {
        let mut state = self.lock_state();
        let now = Instant::now();
        state.prune(now, self.config.window);

        let available = self.config.max_requests.saturating_sub(state.occupied());
        let next_slot_in = if available > 0 {
            None
        } else {
            state.timestamps.front().map(|oldest| {
                self.config
                    .window
                    .saturating_sub(now.saturating_duration_since(*oldest))
            })
        };

        RateLimiterStatus {
            recorded: state.timestamps.len(),
            in_flight: state.in_flight,
            available,
            next_slot_in,
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, WindowState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for SlidingWindowLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}
