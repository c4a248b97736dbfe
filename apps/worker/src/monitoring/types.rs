use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Reachability state of a check
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckState {
    Up,
    #[default]
    Down,
}

impl fmt::Display for CheckState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckState::Up => write!(f, "up"),
            CheckState::Down => write!(f, "down"),
        }
    }
}

/// Scheme used to reach the endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http,
    Https,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP method used for the ping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "get",
            Method::Post => "post",
            Method::Put => "put",
            Method::Delete => "delete",
        }
    }

    /// Method name as sent on the wire
    pub fn to_uppercase(&self) -> String {
        self.as_str().to_uppercase()
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Store keys used for the owner and last-checked fields.
///
/// Older records use `userPhone` and `lastChecked`; a check is written back
/// under the same keys it was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordKeys {
    pub owner: &'static str,
    pub last_checked: &'static str,
}

impl RecordKeys {
    pub const CURRENT: RecordKeys = RecordKeys { owner: "ownerIdentifier", last_checked: "lastCheckedAt" };
    pub const LEGACY: RecordKeys = RecordKeys { owner: "userPhone", last_checked: "lastChecked" };
}

impl Default for RecordKeys {
    fn default() -> Self {
        Self::CURRENT
    }
}

/// A validated endpoint-monitoring configuration.
///
/// Field names serialize to the same keys the API layer stores, and any
/// keys this engine does not understand ride along in `extra` so that
/// writing a check back never drops them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Check {
    pub id: String,
    pub owner_identifier: String,
    pub protocol: Protocol,
    pub url: String,
    pub method: Method,
    pub success_codes: Vec<u16>,
    pub timeout_seconds: u64,
    pub state: CheckState,
    /// Milliseconds since the epoch of the last completed ping
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_checked_at: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    #[serde(skip)]
    pub keys: RecordKeys,
}

impl Check {
    /// `protocol://url`, the target as shown to owners
    pub fn target(&self) -> String {
        format!("{}://{}", self.protocol, self.url)
    }

    pub fn has_been_checked(&self) -> bool {
        self.last_checked_at.is_some()
    }

    /// Serialize back into an untyped store record, under the keys it was read with
    pub fn to_record(&self) -> Value {
        let mut record = match serde_json::to_value(self) {
            Ok(Value::Object(record)) => record,
            _ => Map::new(),
        };

        let renames = [
            (RecordKeys::CURRENT.owner, self.keys.owner),
            (RecordKeys::CURRENT.last_checked, self.keys.last_checked),
        ];
        for (current, stored) in renames {
            if current != stored {
                if let Some(value) = record.remove(current) {
                    record.insert(stored.to_string(), value);
                }
            }
        }

        Value::Object(record)
    }
}

/// Why a ping did not produce a response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PingError {
    Transport { details: String },
    Timeout,
}

impl fmt::Display for PingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PingError::Transport { details } => write!(f, "transport error: {details}"),
            PingError::Timeout => write!(f, "timeout"),
        }
    }
}

/// Result of one ping: a response code or an error, never both
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Outcome {
    Response {
        #[serde(rename = "responseCode")]
        response_code: u16,
    },
    Error {
        error: PingError,
    },
}

impl Outcome {
    pub fn response(code: u16) -> Self {
        Outcome::Response { response_code: code }
    }

    pub fn transport(details: impl Into<String>) -> Self {
        Outcome::Error { error: PingError::Transport { details: details.into() } }
    }

    pub fn timeout() -> Self {
        Outcome::Error { error: PingError::Timeout }
    }

    pub fn response_code(&self) -> Option<u16> {
        match self {
            Outcome::Response { response_code } => Some(*response_code),
            Outcome::Error { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&PingError> {
        match self {
            Outcome::Response { .. } => None,
            Outcome::Error { error } => Some(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_accessors_are_exclusive() {
        let ok = Outcome::response(204);
        assert_eq!(ok.response_code(), Some(204));
        assert!(ok.error().is_none());

        let timeout = Outcome::timeout();
        assert_eq!(timeout.response_code(), None);
        assert_eq!(timeout.error(), Some(&PingError::Timeout));
    }

    #[test]
    fn test_ping_error_serializes_with_kind() {
        let json = serde_json::to_value(Outcome::transport("connection refused")).unwrap();
        assert_eq!(json["error"]["kind"], "transport");
        assert_eq!(json["error"]["details"], "connection refused");

        let json = serde_json::to_value(Outcome::response(200)).unwrap();
        assert_eq!(json["responseCode"], 200);
    }

    #[test]
    fn test_method_uppercase() {
        assert_eq!(Method::Delete.to_uppercase(), "DELETE");
        assert_eq!(reqwest::Method::from(Method::Put), reqwest::Method::PUT);
    }
}
