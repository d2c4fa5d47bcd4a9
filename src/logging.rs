//! Tracing setup for the headless runner.
//!
//! Library code only emits `tracing` events; installing a subscriber is left
//! to binaries and tests.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Checked before `RUST_LOG`.
pub const LOG_ENV_VAR: &str = "MUTATION_WHEEL_LOG";

const DEFAULT_DIRECTIVES: &str = "info";

/// Resolves the filter from `MUTATION_WHEEL_LOG`, then `RUST_LOG`, then `info`.
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV_VAR)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES))
}

/// Installs a stderr fmt subscriber. Returns `false` if one was already set.
pub fn init_logging() -> bool {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_reported_not_fatal() {
        init_logging();
        assert!(!init_logging());
    }
}
