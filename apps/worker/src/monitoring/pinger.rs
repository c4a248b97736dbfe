use std::error::Error as StdError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::sleep;
use url::Url;

use super::types::{Check, Outcome};

/// Executes one network ping for one check
#[async_trait::async_trait]
pub trait Pinger: Send + Sync {
    /// Ping the check's endpoint and return exactly one outcome
    async fn ping(&self, check: &Check) -> Outcome;
}

/// Single-fire slot that hands an outcome to whoever awaits the ping.
///
/// The response path, the transport's own error path and the independent
/// timer all race to `deliver`. The first caller flips `delivered` and wins;
/// every later call is discarded.
pub struct OutcomeSlot {
    delivered: AtomicBool,
    tx: Mutex<Option<oneshot::Sender<Outcome>>>,
}

impl OutcomeSlot {
    pub fn new() -> (Arc<Self>, oneshot::Receiver<Outcome>) {
        let (tx, rx) = oneshot::channel();
        let slot = Self { delivered: AtomicBool::new(false), tx: Mutex::new(Some(tx)) };
        (Arc::new(slot), rx)
    }

    /// Deliver `outcome` if nothing has been delivered yet. Returns whether this call won.
    pub fn deliver(&self, outcome: Outcome) -> bool {
        if self
            .delivered
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::trace!(?outcome, "Discarding late ping event");
            return false;
        }

        let tx = self.tx.lock().unwrap_or_else(PoisonError::into_inner).take();
        match tx {
            Some(tx) => tx.send(outcome).is_ok(),
            None => false,
        }
    }

    pub fn is_delivered(&self) -> bool {
        self.delivered.load(Ordering::Acquire)
    }
}

/// HTTP/HTTPS pinger
pub struct HttpPinger {
    client: reqwest::Client,
}

impl HttpPinger {
    pub fn new() -> reqwest::Result<Self> {
        // Redirects are reported as their own status code rather than followed
        let client = reqwest::Client::builder()
            .user_agent(concat!("uppe-worker/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl Pinger for HttpPinger {
    async fn ping(&self, check: &Check) -> Outcome {
        let timeout = Duration::from_secs(check.timeout_seconds);

        let target = match Url::parse(&check.target()) {
            Ok(target) => target,
            Err(e) => return Outcome::transport(format!("invalid target {}: {e}", check.target())),
        };

        let (slot, rx) = OutcomeSlot::new();

        let request = self.client.request(check.method.into(), target).timeout(timeout);
        let request_slot = Arc::clone(&slot);
        let request_task = tokio::spawn(async move {
            let outcome = match request.send().await {
                Ok(response) => Outcome::response(response.status().as_u16()),
                Err(e) if e.is_timeout() => Outcome::timeout(),
                Err(e) => Outcome::transport(error_chain(&e)),
            };
            request_slot.deliver(outcome);
        });

        let timer_slot = Arc::clone(&slot);
        let timer_task = tokio::spawn(async move {
            sleep(timeout).await;
            timer_slot.deliver(Outcome::timeout());
        });

        let outcome = rx
            .await
            .unwrap_or_else(|_| Outcome::transport("ping ended without delivering an outcome"));

        request_task.abort();
        timer_task.abort();

        outcome
    }
}

fn error_chain(error: &reqwest::Error) -> String {
    let mut details = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        details.push_str(": ");
        details.push_str(&cause.to_string());
        source = cause.source();
    }
    details
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitoring::types::{CheckState, Method, PingError, Protocol, RecordKeys};
    use httpmock::prelude::*;
    use serde_json::Map;

    fn check_for(url: String, method: Method, timeout_seconds: u64) -> Check {
        Check {
            id: "abcdefghij0123456789".to_string(),
            owner_identifier: "5551234567".to_string(),
            protocol: Protocol::Http,
            url,
            method,
            success_codes: vec![200],
            timeout_seconds,
            state: CheckState::Down,
            last_checked_at: None,
            extra: Map::new(),
            keys: RecordKeys::default(),
        }
    }

    #[tokio::test]
    async fn test_slot_delivers_exactly_once() {
        let (slot, rx) = OutcomeSlot::new();

        assert!(!slot.is_delivered());
        assert!(slot.deliver(Outcome::transport("socket hang up")));
        assert!(!slot.deliver(Outcome::timeout()));
        assert!(!slot.deliver(Outcome::response(200)));
        assert!(slot.is_delivered());

        assert_eq!(rx.await.unwrap(), Outcome::transport("socket hang up"));
    }

    #[tokio::test]
    async fn test_slot_concurrent_events_have_one_winner() {
        let (slot, rx) = OutcomeSlot::new();

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let slot = Arc::clone(&slot);
                tokio::spawn(async move {
                    if i % 2 == 0 {
                        slot.deliver(Outcome::timeout())
                    } else {
                        slot.deliver(Outcome::transport("reset"))
                    }
                })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }

        assert_eq!(winners, 1);
        assert!(rx.await.unwrap().error().is_some());
    }

    #[tokio::test]
    async fn test_ping_reports_status_code() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/health");
                then.status(503);
            })
            .await;

        let pinger = HttpPinger::new().unwrap();
        let check = check_for(format!("127.0.0.1:{}/health", server.port()), Method::Post, 2);

        assert_eq!(pinger.ping(&check).await, Outcome::response(503));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_ping_does_not_follow_redirects() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/old");
                then.status(301).header("Location", "/new");
            })
            .await;

        let pinger = HttpPinger::new().unwrap();
        let check = check_for(format!("127.0.0.1:{}/old", server.port()), Method::Get, 2);

        assert_eq!(pinger.ping(&check).await, Outcome::response(301));
    }

    #[tokio::test]
    async fn test_ping_with_very_large_timeout() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET);
                then.status(200);
            })
            .await;

        let pinger = HttpPinger::new().unwrap();
        let check = check_for(format!("127.0.0.1:{}/", server.port()), Method::Get, u64::MAX / 1000 + 1);

        assert_eq!(pinger.ping(&check).await, Outcome::response(200));
    }

    #[tokio::test]
    async fn test_ping_times_out() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET);
                then.status(200).delay(Duration::from_secs(3));
            })
            .await;

        let pinger = HttpPinger::new().unwrap();
        let check = check_for(format!("127.0.0.1:{}/slow", server.port()), Method::Get, 1);

        assert_eq!(pinger.ping(&check).await, Outcome::timeout());
    }

    #[tokio::test]
    async fn test_ping_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let pinger = HttpPinger::new().unwrap();
        let check = check_for(format!("127.0.0.1:{port}/"), Method::Get, 2);

        match pinger.ping(&check).await.error() {
            Some(PingError::Transport { details }) => assert!(!details.is_empty()),
            other => panic!("expected transport error, got {other:?}"),
        }
    }
}
