use serde::{Deserialize, Serialize};

use crate::monitoring::types::{Check, CheckState, Outcome};

/// One line of a check's ping log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// The check as it was when pinged
    pub check: Check,
    pub outcome: Outcome,
    pub state: CheckState,
    #[serde(rename = "alert")]
    pub alert_triggered: bool,
    /// Milliseconds since the epoch
    pub time: i64,
}

impl LogRecord {
    pub fn to_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
