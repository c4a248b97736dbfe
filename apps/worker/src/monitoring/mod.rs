/// Monitoring engine module - turns stored checks into pings, states and alerts
///
/// This module is responsible for:
/// - Validating raw stored records into typed checks
/// - Probing HTTP/HTTPS endpoints with a bounded timeout
/// - Deriving up/down state and deciding when owners are alerted
/// - Scheduling periodic sweeps over every check
pub mod processor;
pub mod pinger;
pub mod scheduler;
pub mod types;
pub mod validation;

pub use processor::{OutcomeProcessor, Processed};
pub use pinger::{HttpPinger, OutcomeSlot, Pinger};
pub use scheduler::{MonitoringScheduler, SchedulerSettings};
pub use types::{Check, CheckState, Outcome, PingError, RecordKeys};
pub use validation::{Rejection, ValidationRules, validate_check};
