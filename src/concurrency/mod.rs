//! Concurrency controller for outbound fetches
//!
//! Every fetch of either phase goes through [`ConcurrencyController::admit`]:
//! - at most N fetches are in flight run-wide
//! - at most M fetches are in flight per host (M is clamped to N)
//! - request starts to one host are spaced by the host delay plus jitter
//!
//! Callers wait for admission; work is never dropped.

mod host_state;

pub use host_state::HostState;

use crate::config::ConcurrencyConfig;
use crate::url::host_key;
use crate::FetchError;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Proof of admission; both permits are released when it is dropped
#[derive(Debug)]
pub struct Admission {
    host: String,
    _host_permit: OwnedSemaphorePermit,
    _global_permit: OwnedSemaphorePermit,
}

impl Admission {
    /// Host key the admission was granted for
    pub fn host(&self) -> &str {
        &self.host
    }
}

/// Run-wide admission and rate limiter
#[derive(Debug)]
pub struct ConcurrencyController {
    global: Arc<Semaphore>,
    hosts: Mutex<HashMap<String, HostState>>,
    max_concurrent: usize,
    per_host: usize,
    base_delay: Duration,
    jitter: Duration,
}

impl ConcurrencyController {
    /// Creates a controller from the `[concurrency]` section
    pub fn new(config: &ConcurrencyConfig) -> Self {
        Self::with_limits(
            config.max_concurrent,
            config.per_host,
            Duration::from_millis(config.crawl_delay_ms),
            Duration::from_millis(config.jitter_ms),
        )
    }

    /// Creates a controller with explicit limits
    ///
    /// # Arguments
    ///
    /// * `max_concurrent` - Run-wide in-flight limit (N, at least 1)
    /// * `per_host` - Per-host in-flight limit (M, clamped to `1..=N`)
    /// * `base_delay` - Minimum spacing between request starts to one host
    /// * `jitter` - Upper bound of the random delay added to each slot
    pub fn with_limits(
        max_concurrent: usize,
        per_host: usize,
        base_delay: Duration,
        jitter: Duration,
    ) -> Self {
        let max_concurrent = max_concurrent.max(1);
        let per_host = per_host.clamp(1, max_concurrent);

        Self {
            global: Arc::new(Semaphore::new(max_concurrent)),
            hosts: Mutex::new(HashMap::new()),
            max_concurrent,
            per_host,
            base_delay,
            jitter,
        }
    }

    /// Waits until a fetch of `url` may start
    ///
    /// # Admission Order
    ///
    /// 1. Acquire a permit for the URL's host
    /// 2. Acquire a run-wide permit
    /// 3. Reserve the host's next request slot (atomic under the host map lock)
    /// 4. Sleep until the slot opens
    ///
    /// # Returns
    ///
    /// * `Ok(Admission)` - Hold it for the duration of the fetch
    /// * `Err(FetchError::Cancelled)` - The controller was closed
    pub async fn admit(&self, url: &str) -> Result<Admission, FetchError> {
        let host = host_key(url);
        let cancelled = || FetchError::Cancelled {
            url: url.to_string(),
        };

        let host_permits = {
            let mut hosts = self.hosts.lock().await;
            let state = hosts
                .entry(host.clone())
                .or_insert_with(|| HostState::new(self.per_host, self.base_delay));
            Arc::clone(&state.permits)
        };

        let host_permit = host_permits
            .acquire_owned()
            .await
            .map_err(|_| cancelled())?;
        let global_permit = Arc::clone(&self.global)
            .acquire_owned()
            .await
            .map_err(|_| cancelled())?;

        let slot = {
            let mut hosts = self.hosts.lock().await;
            let state = hosts
                .entry(host.clone())
                .or_insert_with(|| HostState::new(self.per_host, self.base_delay));
            state.reserve_slot(Instant::now(), self.sample_jitter())
        };

        if slot > Instant::now() {
            tracing::trace!("Waiting {:?} for a slot on {}", slot - Instant::now(), host);
            tokio::time::sleep_until(slot).await;
        }

        Ok(Admission {
            host,
            _host_permit: host_permit,
            _global_permit: global_permit,
        })
    }

    /// Raises the minimum spacing for one host
    pub async fn raise_host_delay(&self, host: &str, delay: Duration) {
        let mut hosts = self.hosts.lock().await;
        let state = hosts
            .entry(host.to_string())
            .or_insert_with(|| HostState::new(self.per_host, self.base_delay));
        if delay > state.delay {
            tracing::info!("Raising request spacing for {} to {:?}", host, delay);
        }
        state.raise_delay(delay);
    }

    /// Stops admitting; pending and future `admit` calls fail with `Cancelled`
    pub async fn close(&self) {
        self.global.close();
        for state in self.hosts.lock().await.values() {
            state.permits.close();
        }
    }

    /// Closes the controller once `token` is cancelled
    pub fn close_on(self: &Arc<Self>, token: CancellationToken) {
        let controller = Arc::clone(self);
        tokio::spawn(async move {
            token.cancelled().await;
            tracing::info!("Cancellation requested; no further fetches will be admitted");
            controller.close().await;
        });
    }

    /// Number of fetches currently holding an admission
    pub fn in_flight(&self) -> usize {
        self.max_concurrent - self.global.available_permits()
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    pub fn per_host(&self) -> usize {
        self.per_host
    }

    fn sample_jitter(&self) -> Duration {
        let max = self.jitter.as_millis() as u64;
        if max == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn run_tasks(
        controller: Arc<ConcurrencyController>,
        urls: Vec<String>,
        hold: Duration,
    ) -> usize {
        let current = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = urls
            .into_iter()
            .map(|url| {
                let controller = Arc::clone(&controller);
                let current = Arc::clone(&current);
                let peak = Arc::clone(&peak);
                tokio::spawn(async move {
                    let _admission = controller.admit(&url).await.unwrap();
                    let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(hold).await;
                    current.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }
        peak.load(Ordering::SeqCst)
    }

    #[test]
    fn test_per_host_clamped_to_global() {
        let controller =
            ConcurrencyController::with_limits(3, 10, Duration::ZERO, Duration::ZERO);
        assert_eq!(controller.max_concurrent(), 3);
        assert_eq!(controller.per_host(), 3);

        let controller = ConcurrencyController::with_limits(0, 0, Duration::ZERO, Duration::ZERO);
        assert_eq!(controller.max_concurrent(), 1);
        assert_eq!(controller.per_host(), 1);
    }

    #[tokio::test]
    async fn test_global_limit_is_never_exceeded() {
        let controller = Arc::new(ConcurrencyController::with_limits(
            2,
            2,
            Duration::ZERO,
            Duration::ZERO,
        ));
        let urls = (0..8)
            .map(|i| format!("https://host{}.example.com/page", i))
            .collect();

        let peak = run_tasks(Arc::clone(&controller), urls, Duration::from_millis(20)).await;
        assert!(peak <= 2, "peak in-flight was {}", peak);
        assert_eq!(controller.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_per_host_limit_is_never_exceeded() {
        let controller = Arc::new(ConcurrencyController::with_limits(
            8,
            1,
            Duration::ZERO,
            Duration::ZERO,
        ));
        let urls = (0..5)
            .map(|i| format!("https://www.samsung.com/uk/tvs/{}", i))
            .collect();

        let peak = run_tasks(controller, urls, Duration::from_millis(10)).await;
        assert_eq!(peak, 1);
    }

    #[tokio::test]
    async fn test_requests_to_one_host_are_spaced() {
        let controller =
            ConcurrencyController::with_limits(4, 4, Duration::from_millis(40), Duration::ZERO);
        let start = Instant::now();

        for i in 0..3 {
            let _admission = controller
                .admit(&format!("https://www.samsung.com/uk/{}", i))
                .await
                .unwrap();
        }

        assert!(start.elapsed() >= Duration::from_millis(80));
    }

    #[tokio::test]
    async fn test_raise_host_delay() {
        let controller =
            ConcurrencyController::with_limits(2, 2, Duration::ZERO, Duration::ZERO);
        controller
            .raise_host_delay("www.samsung.com", Duration::from_millis(50))
            .await;

        let start = Instant::now();
        drop(controller.admit("https://www.samsung.com/uk/a").await.unwrap());
        drop(controller.admit("https://www.samsung.com/uk/b").await.unwrap());
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_closed_controller_refuses_admission() {
        let controller =
            ConcurrencyController::with_limits(1, 1, Duration::ZERO, Duration::ZERO);
        controller.close().await;

        let result = controller.admit("https://www.samsung.com/uk/").await;
        assert!(matches!(result, Err(FetchError::Cancelled { .. })));
    }

    #[tokio::test]
    async fn test_cancellation_unblocks_waiting_callers() {
        let controller = Arc::new(ConcurrencyController::with_limits(
            1,
            1,
            Duration::ZERO,
            Duration::ZERO,
        ));
        let token = CancellationToken::new();
        controller.close_on(token.clone());

        let held = controller.admit("https://www.samsung.com/uk/a").await.unwrap();
        let waiter = {
            let controller = Arc::clone(&controller);
            tokio::spawn(async move { controller.admit("https://www.samsung.com/uk/b").await })
        };

        token.cancel();
        let result = tokio::time::timeout(Duration::from_secs(2), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(result, Err(FetchError::Cancelled { .. })));
        drop(held);
    }
}
