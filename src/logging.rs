// src/logging.rs

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const DEFAULT_FILTER: &str = "warn,equity_ranker=info";

// Filter from RUST_LOG, falling back to warnings globally and info for this crate
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

// Logs go to stderr so stdout carries only the report
pub fn init_logging() {
    let console_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);

    // A second call (tests, embedding) keeps the subscriber already installed
    let _ = tracing_subscriber::registry()
        .with(env_filter())
        .with(console_layer)
        .try_init();
}
