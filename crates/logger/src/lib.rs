//! Process-wide tracing setup shared by the Uppe binaries.

mod subscriber;

pub use subscriber::init;
