/// Outbound alert delivery
///
/// The engine only needs `deliver(destination, message)`; which channel sits
/// behind it is a deployment choice made in the config file.
pub mod twilio;

pub use twilio::TwilioNotifier;

use async_trait::async_trait;
use thiserror::Error;

use crate::monitoring::types::Check;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Invalid destination '{0}'")]
    InvalidDestination(String),

    #[error("Message must be between 1 and {max} characters")]
    InvalidMessage { max: usize },

    #[error("Delivery transport failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Delivery rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Delivers a human-readable alert to a destination
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, destination: &str, message: &str) -> Result<(), DeliveryError>;
}

/// Alert text sent when a check changes state
pub fn alert_message(check: &Check) -> String {
    format!(
        "Alert: your check for {} {} is currently {}",
        check.method.to_uppercase(),
        check.target(),
        check.state
    )
}

/// Writes alerts to the tracing output instead of sending them anywhere
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn deliver(&self, destination: &str, message: &str) -> Result<(), DeliveryError> {
        tracing::info!(destination, "{message}");
        Ok(())
    }
}
