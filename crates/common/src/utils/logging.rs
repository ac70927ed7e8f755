use std::io;
use tracing_subscriber::{fmt, EnvFilter};

// `service` carries the cache/durable-store events, `tower_http` the request spans.
const COMPACT_FILTER: &str = "info,service=info,tower_http=info,axum=info";
const JSON_FILTER: &str = "info,service=debug";

fn filter_or(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Compact human-readable logs on stdout. `RUST_LOG` overrides the filter.
pub fn init_logging_default() {
    let _ = fmt()
        .with_env_filter(filter_or(COMPACT_FILTER))
        .with_target(false)
        .compact()
        .with_writer(io::stdout)
        .try_init();
}

/// JSON structured logs on stdout; durable rewrites are visible at the
/// default filter. `RUST_LOG` overrides the filter.
pub fn init_logging_json() {
    let _ = fmt()
        .with_env_filter(filter_or(JSON_FILTER))
        .with_target(true)
        .json()
        .with_writer(io::stdout)
        .try_init();
}
