//! Normalization of raw stored records into typed checks.
//!
//! Records come from the API layer's store untyped. A record that fails any
//! required-field rule is rejected for the current sweep and left untouched
//! in the store.

use serde_json::{Map, Value};
use thiserror::Error;

use super::types::{Check, CheckState, Method, Protocol, RecordKeys};

pub const ID_LENGTH: usize = 20;
pub const OWNER_LENGTH: usize = 10;

const FIELD_KEYS: [&str; 7] =
    ["id", "protocol", "url", "method", "successCodes", "timeoutSeconds", "state"];

/// Reason a stored record cannot be pinged
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("record is not an object")]
    NotAnObject,
    #[error("id must be a 20 character string")]
    InvalidId,
    #[error("owner identifier must be a 10 character string")]
    InvalidOwner,
    #[error("protocol must be http or https")]
    InvalidProtocol,
    #[error("url must be a non-empty string")]
    EmptyUrl,
    #[error("method must be one of get, post, put, delete")]
    InvalidMethod,
    #[error("success codes must be a non-empty list of status codes")]
    InvalidSuccessCodes,
    #[error("timeout must be a whole number of seconds between {min} and {max}")]
    InvalidTimeout { min: u64, max: u64 },
}

/// Bounds applied to fields whose limits are configurable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationRules {
    pub min_timeout_seconds: u64,
    pub max_timeout_seconds: u64,
    pub require_success_codes: bool,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self { min_timeout_seconds: 1, max_timeout_seconds: 5, require_success_codes: true }
    }
}

/// Validate a raw record, returning a ping-ready check or the first rule it breaks
pub fn validate_check(raw: &Value, rules: &ValidationRules) -> Result<Check, Rejection> {
    let record = raw.as_object().ok_or(Rejection::NotAnObject)?;

    let id = trimmed_with_len(record.get("id"), ID_LENGTH).ok_or(Rejection::InvalidId)?;
    let keys = record_keys(record);
    let owner_identifier =
        trimmed_with_len(record.get(keys.owner), OWNER_LENGTH).ok_or(Rejection::InvalidOwner)?;

    let protocol = match record.get("protocol").and_then(Value::as_str) {
        Some("http") => Protocol::Http,
        Some("https") => Protocol::Https,
        _ => return Err(Rejection::InvalidProtocol),
    };

    let url = record
        .get("url")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .ok_or(Rejection::EmptyUrl)?
        .to_string();

    let method = match record.get("method").and_then(Value::as_str) {
        Some("get") => Method::Get,
        Some("post") => Method::Post,
        Some("put") => Method::Put,
        Some("delete") => Method::Delete,
        _ => return Err(Rejection::InvalidMethod),
    };

    let success_codes = success_codes(record.get("successCodes"), rules.require_success_codes)
        .ok_or(Rejection::InvalidSuccessCodes)?;

    let timeout_seconds = whole_number(record.get("timeoutSeconds"))
        .filter(|secs| (rules.min_timeout_seconds..=rules.max_timeout_seconds).contains(secs))
        .ok_or(Rejection::InvalidTimeout {
            min: rules.min_timeout_seconds,
            max: rules.max_timeout_seconds,
        })?;

    let state = match record.get("state").and_then(Value::as_str) {
        Some("up") => CheckState::Up,
        _ => CheckState::Down,
    };

    let last_checked_at = record
        .get(keys.last_checked)
        .and_then(Value::as_f64)
        .filter(|millis| *millis > 0.0)
        .map(|millis| millis as i64);

    let extra: Map<String, Value> = record
        .iter()
        .filter(|(key, _)| {
            let key = key.as_str();
            !FIELD_KEYS.contains(&key) && key != keys.owner && key != keys.last_checked
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    Ok(Check {
        id,
        owner_identifier,
        protocol,
        url,
        method,
        success_codes,
        timeout_seconds,
        state,
        last_checked_at,
        extra,
        keys,
    })
}

/// Legacy keys win only when the current ones are absent. A record with
/// neither last-checked key follows whichever owner key it uses.
fn record_keys(record: &Map<String, Value>) -> RecordKeys {
    let pick = |current: &'static str, legacy: &'static str| {
        if !record.contains_key(current) && record.contains_key(legacy) { Some(legacy) } else { None }
    };

    let owner = pick(RecordKeys::CURRENT.owner, RecordKeys::LEGACY.owner)
        .unwrap_or(RecordKeys::CURRENT.owner);
    let last_checked = pick(RecordKeys::CURRENT.last_checked, RecordKeys::LEGACY.last_checked)
        .unwrap_or_else(|| {
            let neither = !record.contains_key(RecordKeys::CURRENT.last_checked);
            if neither && owner == RecordKeys::LEGACY.owner {
                RecordKeys::LEGACY.last_checked
            } else {
                RecordKeys::CURRENT.last_checked
            }
        });

    RecordKeys { owner, last_checked }
}

fn trimmed_with_len(value: Option<&Value>, len: usize) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| s.chars().count() == len)
        .map(str::to_string)
}

/// Integers only; `3.0` counts, `3.5` does not
fn whole_number(value: Option<&Value>) -> Option<u64> {
    let value = value?;
    if let Some(n) = value.as_u64() {
        return Some(n);
    }
    value.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64)
}

fn success_codes(value: Option<&Value>, require_non_empty: bool) -> Option<Vec<u16>> {
    let items = value?.as_array()?;
    if require_non_empty && items.is_empty() {
        return None;
    }

    let mut codes = Vec::with_capacity(items.len());
    for item in items {
        let code = u16::try_from(whole_number(Some(item))?).ok()?;
        if !codes.contains(&code) {
            codes.push(code);
        }
    }
    Some(codes)
}
