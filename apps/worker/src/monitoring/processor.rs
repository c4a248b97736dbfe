use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::types::{Check, CheckState, Outcome};
use crate::logs::{LogRecord, LogStore};
use crate::notifier::{Notifier, alert_message};
use crate::store::Store;

/// `up` iff there was no error and the response code is a success code
pub fn derive_state(check: &Check, outcome: &Outcome) -> CheckState {
    match outcome.response_code() {
        Some(code) if outcome.error().is_none() && check.success_codes.contains(&code) => {
            CheckState::Up
        }
        _ => CheckState::Down,
    }
}

/// A check that has never been pinged does not alert
pub fn alert_warranted(check: &Check, new_state: CheckState) -> bool {
    check.has_been_checked() && check.state != new_state
}

/// What processing one outcome did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Processed {
    pub state: CheckState,
    pub alert_triggered: bool,
    pub persisted: bool,
    pub logged: bool,
    pub notified: bool,
}

/// Turns ping outcomes into state updates, log lines and alerts
pub struct OutcomeProcessor {
    store: Arc<dyn Store>,
    logs: Arc<LogStore>,
    notifier: Arc<dyn Notifier>,
    category: String,
}

impl OutcomeProcessor {
    pub fn new(
        store: Arc<dyn Store>,
        logs: Arc<LogStore>,
        notifier: Arc<dyn Notifier>,
        category: impl Into<String>,
    ) -> Self {
        Self { store, logs, notifier, category: category.into() }
    }

    /// Persist, log and (if warranted) alert for one outcome.
    ///
    /// Failures in any step are reported and never undo earlier steps. The log
    /// records whether the transition warranted an alert; the alert itself is
    /// only sent once the new state is persisted, otherwise the next sweep
    /// re-derives the same transition and alerts then.
    pub async fn process(&self, check: Check, outcome: Outcome, checked_at: DateTime<Utc>) -> Processed {
        let state = derive_state(&check, &outcome);
        let warranted = alert_warranted(&check, state);
        let time = checked_at.timestamp_millis();

        let mut updated = check.clone();
        updated.state = state;
        updated.last_checked_at = Some(time);

        // No version check: overlapping sweeps for the same id are last-writer-wins
        let persisted = match self.store.update(&self.category, &updated.id, &updated.to_record()).await {
            Ok(()) => true,
            Err(e) => {
                warn!(check_id = %updated.id, error = %e, "Unable to save check update");
                false
            }
        };

        let record = LogRecord { check, outcome, state, alert_triggered: warranted, time };
        let logged = match record.to_line() {
            Ok(line) => match self.logs.append(&updated.id, &line).await {
                Ok(()) => true,
                Err(e) => {
                    warn!(check_id = %updated.id, error = %e, "Could not write ping log");
                    false
                }
            },
            Err(e) => {
                warn!(check_id = %updated.id, error = %e, "Could not serialize ping log");
                false
            }
        };

        let notified = if warranted && persisted {
            self.alert_owner(&updated).await
        } else if warranted {
            warn!(check_id = %updated.id, %state, "State change not saved, alert deferred to next sweep");
            false
        } else {
            debug!(check_id = %updated.id, %state, "Check outcome has not changed, no alert needed");
            false
        };

        Processed { state, alert_triggered: warranted, persisted, logged, notified }
    }

    async fn alert_owner(&self, check: &Check) -> bool {
        let message = alert_message(check);
        match self.notifier.deliver(&check.owner_identifier, &message).await {
            Ok(()) => {
                info!(check_id = %check.id, "Owner alerted of state change: {message}");
                true
            }
            Err(e) => {
                warn!(check_id = %check.id, error = %e, "Unable to alert owner of state change");
                false
            }
        }
    }
}
