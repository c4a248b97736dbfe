use std::env::var;

use tracing::{level_filters::LevelFilter, warn};
use tracing_subscriber::{Layer, filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing at `INFO` unless `RUST_LOG` says otherwise.
pub fn init() {
    init_with_level(LevelFilter::INFO);
}

/// Initialize the global subscriber.
///
/// `RUST_LOG` narrows or widens the filter, `RUST_LOG_FORMAT=json` switches to
/// JSON lines for log shippers. Calling this twice is a no-op.
fn init_with_level(level: LevelFilter) {
    let env_filter = EnvFilter::builder().with_default_directive(level.into()).from_env_lossy();

    let log_format = var("RUST_LOG_FORMAT").unwrap_or_default();

    let log_layer = match log_format.as_str() {
        "json" => tracing_subscriber::fmt::layer().json().with_filter(env_filter).boxed(),
        _ => tracing_subscriber::fmt::layer()
            .compact()
            .without_time()
            .with_filter(env_filter)
            .boxed(),
    };

    if let Err(error) = tracing_subscriber::registry().with(log_layer).try_init() {
        warn!("Tracing already initialized: {error}");
    }
}
