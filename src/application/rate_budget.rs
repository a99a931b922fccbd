//! Per-caller request budget
//!
//! Fixed windows kept in process memory. Counters reset on restart; the
//! budget caps cost, it does not guarantee correctness.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::domain::{GatewayError, GatewayResult};
use crate::support::ShutdownSignal;

/// Rate budget configuration (`[rate_limit]`)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct RateBudgetConfig {
    /// Requests allowed per caller per window; 0 disables the budget
    pub requests_per_window: u32,
    pub window_secs: u64,
}

impl Default for RateBudgetConfig {
    fn default() -> Self {
        Self {
            requests_per_window: 120,
            window_secs: 60,
        }
    }
}

impl RateBudgetConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs.max(1))
    }
}

#[derive(Debug)]
struct Window {
    started: Instant,
    count: u32,
}

#[derive(Clone)]
pub struct RateBudget {
    limit: u32,
    window: Duration,
    windows: Arc<DashMap<String, Window>>,
}

impl RateBudget {
    pub fn new(config: RateBudgetConfig) -> Self {
        Self::with_window(config.requests_per_window, config.window())
    }

    pub fn with_window(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            windows: Arc::new(DashMap::new()),
        }
    }

    /// Count one request for `caller`, or refuse it with the time left in
    /// the current window. The entry lock makes increment-and-compare
    /// atomic per caller.
    pub fn check(&self, caller: &str) -> GatewayResult<()> {
        if self.limit == 0 {
            return Ok(());
        }

        let now = Instant::now();
        let mut window = self
            .windows
            .entry(caller.to_string())
            .or_insert_with(|| Window {
                started: now,
                count: 0,
            });

        let elapsed = now.saturating_duration_since(window.started);
        if elapsed >= self.window {
            window.started = now;
            window.count = 0;
        }

        if window.count >= self.limit {
            let retry_after = self
                .window
                .saturating_sub(now.saturating_duration_since(window.started));
            drop(window);
            metrics::counter!("gateway_throttled_total").increment(1);
            return Err(GatewayError::Throttled { retry_after });
        }

        window.count += 1;
        Ok(())
    }

    /// Drop windows that have expired. Returns how many were removed.
    pub fn prune(&self) -> usize {
        let now = Instant::now();
        let before = self.windows.len();
        self.windows
            .retain(|_, w| now.saturating_duration_since(w.started) < self.window);
        before.saturating_sub(self.windows.len())
    }

    pub fn tracked_callers(&self) -> usize {
        self.windows.len()
    }

    /// Prune once per window until shutdown.
    pub fn spawn_pruner(&self, shutdown: ShutdownSignal) -> JoinHandle<()> {
        let budget = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(budget.window);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = budget.prune();
                        if removed > 0 {
                            debug!(removed, "Pruned expired rate windows");
                        }
                    }
                    _ = shutdown.wait() => {
                        info!("Rate window pruner stopped");
                        break;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn throttles_after_the_budget_is_spent() {
        let budget = RateBudget::with_window(3, Duration::from_secs(60));
        for _ in 0..3 {
            budget.check("caller").unwrap();
        }
        match budget.check("caller") {
            Err(GatewayError::Throttled { retry_after }) => {
                assert!(retry_after <= Duration::from_secs(60));
                assert!(retry_after > Duration::from_secs(50));
            }
            other => panic!("expected throttling, got {:?}", other),
        }
        // Other callers keep their own budget.
        budget.check("someone-else").unwrap();
    }

    #[test]
    fn window_resets_after_expiry() {
        let budget = RateBudget::with_window(1, Duration::from_millis(30));
        budget.check("caller").unwrap();
        assert!(budget.check("caller").is_err());
        std::thread::sleep(Duration::from_millis(40));
        budget.check("caller").unwrap();
    }

    #[test]
    fn zero_limit_disables_the_budget() {
        let budget = RateBudget::new(RateBudgetConfig {
            requests_per_window: 0,
            window_secs: 1,
        });
        for _ in 0..1000 {
            budget.check("caller").unwrap();
        }
        assert_eq!(budget.tracked_callers(), 0);
    }

    #[test]
    fn prune_drops_expired_windows() {
        let budget = RateBudget::with_window(5, Duration::from_millis(20));
        budget.check("a").unwrap();
        budget.check("b").unwrap();
        assert_eq!(budget.prune(), 0);
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(budget.prune(), 2);
        assert_eq!(budget.tracked_callers(), 0);
    }

    #[tokio::test]
    async fn concurrent_checks_never_exceed_the_budget() {
        let budget = RateBudget::with_window(50, Duration::from_secs(60));
        let mut tasks = Vec::new();
        for _ in 0..8 {
            let budget = budget.clone();
            tasks.push(tokio::spawn(async move {
                (0..20).filter(|_| budget.check("burst").is_ok()).count()
            }));
        }
        let mut allowed = 0;
        for task in tasks {
            allowed += task.await.unwrap();
        }
        assert_eq!(allowed, 50);
    }

    #[tokio::test]
    async fn pruner_stops_on_shutdown() {
        let budget = RateBudget::with_window(5, Duration::from_millis(10));
        let shutdown = ShutdownSignal::new();
        let handle = budget.spawn_pruner(shutdown.clone());
        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
