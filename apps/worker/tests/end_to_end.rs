//! End-to-end tests for the worker
//!
//! These drive whole sweeps through in-memory collaborators and an on-disk
//! log directory.

use std::sync::{Arc, Mutex};

use chrono::{TimeZone, Utc};
use serde_json::json;

use uppe_worker::logs::{LogRecord, LogRotator, LogStore};
use uppe_worker::monitoring::{
    Check, CheckState, MonitoringScheduler, Outcome, OutcomeProcessor, Pinger, SchedulerSettings,
};
use uppe_worker::notifier::{DeliveryError, Notifier};
use uppe_worker::store::MemoryStore;

const ID: &str = "abcdefghij0123456789";

/// Returns queued outcomes in order
struct ScriptedPinger {
    outcomes: Mutex<Vec<Outcome>>,
}

#[async_trait::async_trait]
impl Pinger for ScriptedPinger {
    async fn ping(&self, _check: &Check) -> Outcome {
        self.outcomes.lock().unwrap().remove(0)
    }
}

#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn deliver(&self, destination: &str, message: &str) -> Result<(), DeliveryError> {
        self.sent.lock().unwrap().push((destination.to_string(), message.to_string()));
        Ok(())
    }
}

fn read_records(raw: &[u8]) -> Vec<LogRecord> {
    String::from_utf8(raw.to_vec())
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[tokio::test]
async fn test_first_ping_then_outage() {
    let _ = tracing_subscriber::fmt::try_init();

    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::new());
    store
        .insert(
            "checks",
            ID,
            json!({
                "id": ID,
                "ownerIdentifier": "5551234567",
                "protocol": "https",
                "url": "example.com/status",
                "method": "get",
                "successCodes": [200],
                "timeoutSeconds": 3,
                "state": "down",
            }),
        )
        .await;

    let logs = Arc::new(LogStore::new(dir.path()));
    let notifier = Arc::new(RecordingNotifier::default());
    let pinger = Arc::new(ScriptedPinger {
        outcomes: Mutex::new(vec![Outcome::response(200), Outcome::timeout()]),
    });
    let processor = Arc::new(OutcomeProcessor::new(
        store.clone(),
        Arc::clone(&logs),
        notifier.clone(),
        "checks",
    ));
    let scheduler = Arc::new(MonitoringScheduler::new(
        store.clone(),
        pinger,
        processor,
        SchedulerSettings::default(),
    ));

    // First sweep: never pinged before, comes up, no alert
    let first_sweep = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
    for handle in scheduler.sweep(first_sweep).await {
        handle.await.unwrap();
    }

    let stored = store.get("checks", ID).await.unwrap();
    assert_eq!(stored["state"], "up");
    assert_eq!(stored["lastCheckedAt"], 1_700_000_000_000_i64);
    assert!(notifier.sent.lock().unwrap().is_empty());

    let records = read_records(&logs.read(ID).await.unwrap());
    assert_eq!(records.len(), 1);
    assert!(!records[0].alert_triggered);
    assert_eq!(records[0].state, CheckState::Up);

    // Second sweep: times out, goes down, owner alerted once
    let second_sweep = Utc.timestamp_millis_opt(1_700_000_060_000).unwrap();
    for handle in scheduler.sweep(second_sweep).await {
        handle.await.unwrap();
    }

    let stored = store.get("checks", ID).await.unwrap();
    assert_eq!(stored["state"], "down");
    assert_eq!(stored["lastCheckedAt"], 1_700_000_060_000_i64);

    let sent = notifier.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "5551234567");
    let message = &sent[0].1;
    assert!(message.contains("GET"));
    assert!(message.contains("https://example.com/status"));
    assert!(message.contains("down"));

    let live = logs.read(ID).await.unwrap();
    let records = read_records(&live);
    assert_eq!(records.len(), 2);
    assert!(records[1].alert_triggered);
    assert_eq!(records[1].outcome, Outcome::timeout());

    // Rotation archives exactly what was live and empties the log
    let rotated_at = Utc.timestamp_millis_opt(1_700_086_400_000).unwrap();
    let rotator = LogRotator::new(Arc::clone(&logs), std::time::Duration::from_secs(86_400));
    let report = rotator.rotate_logs(rotated_at).await;
    assert_eq!(report.archived, 1);

    assert!(logs.read(ID).await.unwrap().is_empty());
    let archive_id = LogRotator::archive_id(ID, rotated_at);
    assert_eq!(logs.decompress(&archive_id).await.unwrap(), live);
}
