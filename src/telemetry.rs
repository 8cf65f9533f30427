//! Logging setup.
//!
//! Diagnostics go to stderr through `tracing-subscriber`; stdout is reserved
//! for the CLI's progress output. Filter priority: `RUST_LOG` > `[logging]
//! level` > `info`.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber. Later calls are no-ops.
pub fn init(level: &str) {
    let default_filter = format!("warn,weekly_post={level}");
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init()
        .ok();
}
