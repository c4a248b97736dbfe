/// Per-check ping logs and their periodic rotation
///
/// Every ping appends one JSON line to `<dir>/<check id>.log`. Rotation
/// compresses a live log into `<dir>/<check id>-<timestamp>.gz.b64` and then
/// empties the live file.
pub mod record;
pub mod rotation;
pub mod store;

pub use record::LogRecord;
pub use rotation::LogRotator;
pub use store::{LogStore, LogStoreError};
