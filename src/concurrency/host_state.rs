use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::Instant;

/// Rate and admission state for one host
///
/// Requests to a host are spaced by `delay` plus per-request jitter. Slots are
/// reserved in arrival order, so concurrent callers never share a slot.
#[derive(Debug)]
pub struct HostState {
    /// In-flight limit for this host (M)
    pub permits: Arc<Semaphore>,

    /// Minimum spacing between request starts
    pub delay: Duration,

    /// Earliest instant the next request may start
    pub next_allowed: Option<Instant>,

    /// Number of requests admitted so far
    pub request_count: u64,
}

impl HostState {
    pub fn new(per_host: usize, delay: Duration) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(per_host)),
            delay,
            next_allowed: None,
            request_count: 0,
        }
    }

    /// Reserves the next request slot and returns the instant it opens
    ///
    /// The following slot is pushed out by `delay + jitter` from this one.
    pub fn reserve_slot(&mut self, now: Instant, jitter: Duration) -> Instant {
        let start = match self.next_allowed {
            Some(next) if next > now => next,
            _ => now,
        };
        self.next_allowed = Some(start + self.delay + jitter);
        self.request_count += 1;
        start
    }

    /// Widens the spacing, e.g. to honor a robots.txt crawl-delay
    ///
    /// The delay never shrinks.
    pub fn raise_delay(&mut self, delay: Duration) {
        if delay > self.delay {
            self.delay = delay;
        }
    }

    /// Time until the next slot opens, or `None` if a request may start now
    pub fn time_until_next_request(&self, now: Instant) -> Option<Duration> {
        self.next_allowed
            .filter(|next| *next > now)
            .map(|next| next - now)
    }
}
