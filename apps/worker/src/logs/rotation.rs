//! Periodic compression of live ping logs.
//!
//! A rotation cycle archives every live log under a new, timestamped id and
//! then truncates the live file. The two steps are separate writes: a crash
//! between them leaves the content both archived and live, and the next
//! cycle archives it again. Appends racing a truncate can also be lost.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tracing::{debug, info, warn};

use super::store::{LogStore, LogStoreError};

/// Default time between rotation cycles (one day)
pub const DEFAULT_ROTATION_INTERVAL: Duration = Duration::from_secs(24 * 3600);

/// Per-cycle counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RotationReport {
    pub archived: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug)]
enum Rotated {
    Archived { archive_id: String, bytes: usize },
    Empty,
}

/// Compresses and truncates live logs on its own tick
pub struct LogRotator {
    logs: Arc<LogStore>,
    interval: Duration,
}

impl LogRotator {
    pub fn new(logs: Arc<LogStore>, interval: Duration) -> Self {
        Self { logs, interval }
    }

    /// Archive id for a live log rotated at `rotated_at`
    pub fn archive_id(id: &str, rotated_at: DateTime<Utc>) -> String {
        format!("{id}-{}", rotated_at.timestamp_millis())
    }

    /// Run one rotation cycle over every live log
    pub async fn rotate_logs(&self, rotated_at: DateTime<Utc>) -> RotationReport {
        let ids = match self.logs.list(false).await {
            Ok(ids) if !ids.is_empty() => ids,
            Ok(_) => {
                debug!("No logs to rotate");
                return RotationReport::default();
            }
            Err(e) => {
                warn!(error = %e, "Could not list logs for rotation");
                return RotationReport::default();
            }
        };

        let results = join_all(ids.iter().map(|id| self.rotate_one(id, rotated_at))).await;

        let mut report = RotationReport::default();
        for (id, result) in ids.iter().zip(results) {
            match result {
                Ok(Rotated::Archived { archive_id, bytes }) => {
                    debug!(log_id = %id, %archive_id, bytes, "Rotated log");
                    report.archived += 1;
                }
                Ok(Rotated::Empty) => report.skipped += 1,
                Err(e) => {
                    warn!(log_id = %id, error = %e, "Log rotation failed");
                    report.failed += 1;
                }
            }
        }

        info!(
            "Log rotation completed: {} archived, {} empty, {} failed",
            report.archived, report.skipped, report.failed
        );
        report
    }

    async fn rotate_one(&self, id: &str, rotated_at: DateTime<Utc>) -> Result<Rotated, LogStoreError> {
        if self.logs.is_empty(id).await? {
            return Ok(Rotated::Empty);
        }

        let archive_id = Self::archive_id(id, rotated_at);
        let bytes = self.logs.compress(id, &archive_id).await?;
        self.logs.truncate(id).await?;

        Ok(Rotated::Archived { archive_id, bytes })
    }

    /// Start the background rotation task; the first cycle runs immediately
    pub fn start_periodic_rotation(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                self.rotate_logs(Utc::now()).await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn rotated_at() -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_700_000_000_000).unwrap()
    }

    #[test]
    fn test_archive_id_uses_rotation_timestamp() {
        assert_eq!(LogRotator::archive_id("abc", rotated_at()), "abc-1700000000000");
    }

    #[tokio::test]
    async fn test_rotation_archives_and_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let logs = Arc::new(LogStore::new(dir.path()));
        let content = "{\"state\":\"up\"}\n{\"state\":\"down\"}\n";
        for line in content.lines() {
            logs.append("abc", line).await.unwrap();
        }

        let rotator = LogRotator::new(Arc::clone(&logs), DEFAULT_ROTATION_INTERVAL);
        let report = rotator.rotate_logs(rotated_at()).await;

        assert_eq!(report, RotationReport { archived: 1, skipped: 0, failed: 0 });
        assert!(logs.is_empty("abc").await.unwrap());

        let archives: Vec<_> = logs
            .list(true)
            .await
            .unwrap()
            .into_iter()
            .filter(|id| id != "abc")
            .collect();
        assert_eq!(archives, vec!["abc-1700000000000".to_string()]);
        assert_eq!(logs.decompress(&archives[0]).await.unwrap(), content.as_bytes());
    }

    #[tokio::test]
    async fn test_empty_logs_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let logs = Arc::new(LogStore::new(dir.path()));
        logs.append("abc", "line").await.unwrap();
        logs.truncate("abc").await.unwrap();

        let rotator = LogRotator::new(Arc::clone(&logs), DEFAULT_ROTATION_INTERVAL);
        let report = rotator.rotate_logs(rotated_at()).await;

        assert_eq!(report.skipped, 1);
        assert_eq!(logs.list(true).await.unwrap(), vec!["abc".to_string()]);
    }

    #[tokio::test]
    async fn test_existing_archive_keeps_live_content() {
        let dir = tempfile::tempdir().unwrap();
        let logs = Arc::new(LogStore::new(dir.path()));
        logs.append("abc", "first").await.unwrap();

        let rotator = LogRotator::new(Arc::clone(&logs), DEFAULT_ROTATION_INTERVAL);
        rotator.rotate_logs(rotated_at()).await;

        logs.append("abc", "second").await.unwrap();
        let report = rotator.rotate_logs(rotated_at()).await;

        assert_eq!(report.failed, 1);
        assert_eq!(logs.read("abc").await.unwrap(), b"second\n");
        assert_eq!(logs.decompress("abc-1700000000000").await.unwrap(), b"first\n");
    }

    #[tokio::test]
    async fn test_no_logs_is_a_quiet_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let rotator =
            LogRotator::new(Arc::new(LogStore::new(dir.path().join("none"))), DEFAULT_ROTATION_INTERVAL);
        assert_eq!(rotator.rotate_logs(rotated_at()).await, RotationReport::default());
    }
}
