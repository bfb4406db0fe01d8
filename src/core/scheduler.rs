//! Fixed-interval scheduler driving the signal poller

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::error::ConfigError;

use super::poller::SignalPoller;

/// Timer task that issues a poll cycle every `interval`, the first one
/// immediately. Each cycle runs in its own task so a slow response never
/// delays the next tick.
pub struct PollScheduler {
    poller: Arc<SignalPoller>,
    interval: Duration,
    handle: Arc<RwLock<Option<tokio::task::JoinHandle<()>>>>,
}

impl PollScheduler {
    /// Create a new scheduler
    ///
    /// # Arguments
    /// * `poller` - Poller refreshed on every tick
    /// * `interval` - Poll period, must be non-zero
    pub fn new(poller: Arc<SignalPoller>, interval: Duration) -> Result<Self, ConfigError> {
        if interval.is_zero() {
            return Err(ConfigError::Invalid {
                var: "POLL_INTERVAL_SECONDS",
                reason: "poll interval must be greater than zero".to_string(),
            });
        }

        info!(interval_ms = interval.as_millis() as u64, "PollScheduler: created");

        Ok(Self {
            poller,
            interval,
            handle: Arc::new(RwLock::new(None)),
        })
    }

    pub fn poller(&self) -> &Arc<SignalPoller> {
        &self.poller
    }

    /// Start the timer. Calling it while running is a no-op.
    pub async fn start(&self) {
        let mut slot = self.handle.write().await;
        if slot.is_some() {
            warn!("PollScheduler: already running");
            return;
        }

        let poller = self.poller.clone();
        let interval = self.interval;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let poller = poller.clone();
                tokio::spawn(async move {
                    poller.refresh().await;
                });
            }
        });

        *slot = Some(handle);
        info!("PollScheduler: started");
    }

    /// Clear the timer and end the poller session; cycles still in flight
    /// complete without touching the dashboard.
    pub async fn stop(&self) {
        let mut slot = self.handle.write().await;
        if let Some(handle) = slot.take() {
            handle.abort();
            self.poller.end_session();
            info!("PollScheduler: stopped");
        }
    }

    pub async fn is_running(&self) -> bool {
        self.handle.read().await.is_some()
    }
}
