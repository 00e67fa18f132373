//! Tracing subscriber setup for the binary

use tracing_subscriber::{fmt, EnvFilter};

use crate::error::BoxError;

/// Filter used when `RUST_LOG` is unset or unparsable
pub const DEFAULT_FILTER: &str = "info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Installs the global subscriber, writing to stderr so stdout stays pure JSON output
pub fn init(json: bool) -> Result<(), BoxError> {
    let builder = fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr);
    if json {
        builder.json().with_current_span(false).try_init()
    } else {
        builder.with_target(false).try_init()
    }
}
