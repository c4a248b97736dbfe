//! Uppe worker - background monitoring engine.
//!
//! Periodically pings every registered check, tracks whether it is up or
//! down, alerts owners on transitions and keeps a rotated log of every ping.

pub mod config;
pub mod logs;
pub mod monitoring;
pub mod notifier;
pub mod store;

pub use config::Config;
