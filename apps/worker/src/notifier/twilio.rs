//! SMS alerts through the Twilio messages API.

use async_trait::async_trait;

use super::{DeliveryError, Notifier};

pub const DEFAULT_API_BASE: &str = "https://api.twilio.com";
pub const MAX_MESSAGE_CHARS: usize = 1600;
const PHONE_LENGTH: usize = 10;

/// Twilio account settings
#[derive(Debug, Clone)]
pub struct TwilioSettings {
    pub account_sid: String,
    pub auth_token: String,
    pub from_phone: String,
    pub api_base: String,
}

pub struct TwilioNotifier {
    client: reqwest::Client,
    settings: TwilioSettings,
}

impl TwilioNotifier {
    pub fn new(settings: TwilioSettings) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self { client, settings })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.settings.api_base.trim_end_matches('/'),
            self.settings.account_sid
        )
    }
}

/// Trimmed ten-digit destination, or `None`
fn normalize_phone(destination: &str) -> Option<&str> {
    let phone = destination.trim();
    (phone.chars().count() == PHONE_LENGTH).then_some(phone)
}

fn normalize_message(message: &str) -> Option<&str> {
    let message = message.trim();
    let len = message.chars().count();
    (len > 0 && len <= MAX_MESSAGE_CHARS).then_some(message)
}

#[async_trait]
impl Notifier for TwilioNotifier {
    async fn deliver(&self, destination: &str, message: &str) -> Result<(), DeliveryError> {
        let phone = normalize_phone(destination)
            .ok_or_else(|| DeliveryError::InvalidDestination(destination.to_string()))?;
        let body = normalize_message(message)
            .ok_or(DeliveryError::InvalidMessage { max: MAX_MESSAGE_CHARS })?;

        let to = format!("+1{phone}");
        let form = [("From", self.settings.from_phone.as_str()), ("To", to.as_str()), ("Body", body)];

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.settings.account_sid, Some(&self.settings.auth_token))
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(DeliveryError::Rejected { status: status.as_u16(), body })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn settings(api_base: String) -> TwilioSettings {
        TwilioSettings {
            account_sid: "AC123".to_string(),
            auth_token: "secret".to_string(),
            from_phone: "+15550000000".to_string(),
            api_base,
        }
    }

    #[test]
    fn test_input_normalization() {
        assert_eq!(normalize_phone(" 5551234567 "), Some("5551234567"));
        assert_eq!(normalize_phone("555"), None);
        assert_eq!(normalize_message("   "), None);
        assert!(normalize_message(&"x".repeat(MAX_MESSAGE_CHARS + 1)).is_none());
    }

    #[tokio::test]
    async fn test_rejects_bad_destination_without_sending() {
        let notifier = TwilioNotifier::new(settings("http://127.0.0.1:9".to_string())).unwrap();
        assert!(matches!(
            notifier.deliver("123", "hello").await,
            Err(DeliveryError::InvalidDestination(_))
        ));
    }

    #[tokio::test]
    async fn test_posts_form_to_messages_endpoint() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/2010-04-01/Accounts/AC123/Messages.json")
                    .x_www_form_urlencoded_tuple("To", "+15551234567")
                    .x_www_form_urlencoded_tuple("Body", "check is down");
                then.status(201);
            })
            .await;

        let notifier = TwilioNotifier::new(settings(server.base_url())).unwrap();
        notifier.deliver("5551234567", "check is down").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_success_status_is_rejection() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(401).body("unauthorized");
            })
            .await;

        let notifier = TwilioNotifier::new(settings(server.base_url())).unwrap();
        assert!(matches!(
            notifier.deliver("5551234567", "check is down").await,
            Err(DeliveryError::Rejected { status: 401, .. })
        ));
    }
}
