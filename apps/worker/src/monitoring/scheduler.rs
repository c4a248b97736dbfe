use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use super::processor::{OutcomeProcessor, Processed};
use super::pinger::Pinger;
use super::validation::{ValidationRules, validate_check};
use crate::store::{Store, StoreError};

/// Default time between sweeps
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Scheduler tunables
#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    /// Store category holding the checks
    pub category: String,
    pub interval: Duration,
    pub rules: ValidationRules,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            category: "checks".to_string(),
            interval: DEFAULT_SWEEP_INTERVAL,
            rules: ValidationRules::default(),
        }
    }
}

/// Monitoring scheduler - drives periodic sweeps over every stored check.
///
/// Each check runs as its own task. A sweep does not wait for the previous
/// one, so slow pings can overlap the next tick; nothing caps the fan-out.
pub struct MonitoringScheduler {
    store: Arc<dyn Store>,
    pinger: Arc<dyn Pinger>,
    processor: Arc<OutcomeProcessor>,
    settings: SchedulerSettings,
}

impl MonitoringScheduler {
    pub fn new(
        store: Arc<dyn Store>,
        pinger: Arc<dyn Pinger>,
        processor: Arc<OutcomeProcessor>,
        settings: SchedulerSettings,
    ) -> Self {
        Self { store, pinger, processor, settings }
    }

    /// List all checks and spawn one validate-ping-process task per id
    pub async fn sweep(self: &Arc<Self>, started_at: DateTime<Utc>) -> Vec<JoinHandle<Option<Processed>>> {
        let ids = match self.store.list(&self.settings.category).await {
            Ok(ids) => ids,
            Err(StoreError::NotFoundOrEmpty(_)) => {
                debug!("Could not find any checks to process");
                return Vec::new();
            }
            Err(e) => {
                warn!(error = %e, "Could not list checks");
                return Vec::new();
            }
        };

        debug!("Sweeping {} checks", ids.len());

        ids.into_iter()
            .map(|id| {
                let scheduler = Arc::clone(self);
                tokio::spawn(async move { scheduler.run_check(&id, started_at).await })
            })
            .collect()
    }

    /// Read, validate, ping and process one check. `None` if it was skipped.
    pub async fn run_check(&self, id: &str, started_at: DateTime<Utc>) -> Option<Processed> {
        let raw = match self.store.read(&self.settings.category, id).await {
            Ok(raw) => raw,
            Err(e) => {
                debug!(check_id = %id, error = %e, "Error reading check");
                return None;
            }
        };

        let check = match validate_check(&raw, &self.settings.rules) {
            Ok(check) => check,
            Err(rejection) => {
                warn!(check_id = %id, %rejection, "Check is not properly formatted, skipping it");
                return None;
            }
        };

        let outcome = self.pinger.ping(&check).await;
        debug!(check_id = %check.id, ?outcome, "Ping completed");

        Some(self.processor.process(check, outcome, started_at).await)
    }

    /// Start the sweep loop; the first sweep fires immediately
    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!("Background workers are running, sweeping every {:?}", self.settings.interval);

            let mut timer = interval(self.settings.interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                timer.tick().await;
                // Handles are dropped: pings finish on their own, even past the next tick
                let _ = self.sweep(Utc::now()).await;
            }
        })
    }
}
