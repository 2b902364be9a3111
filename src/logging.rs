//! Logging setup for the binaries.
//!
//! The library only emits `tracing` events; installing a subscriber is left
//! to whoever owns the process. Filter precedence: `FEATUREFENCE_LOG`, then
//! `RUST_LOG`, then the caller's default level.

use anyhow::{Context, Result, anyhow};
use std::env;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "FEATUREFENCE_LOG";

/// Pick the filter directive from the environment values and a default.
pub fn filter_directive(
    crate_env: Option<String>,
    rust_log: Option<String>,
    default_level: &str,
) -> String {
    crate_env
        .filter(|value| !value.trim().is_empty())
        .or_else(|| rust_log.filter(|value| !value.trim().is_empty()))
        .unwrap_or_else(|| format!("featurefence={default_level}"))
}

/// Install a stderr subscriber. Call once at startup.
pub fn init_logging(default_level: &str) -> Result<()> {
    let directive = filter_directive(
        env::var(LOG_ENV).ok(),
        env::var("RUST_LOG").ok(),
        default_level,
    );
    let filter = EnvFilter::try_new(&directive)
        .with_context(|| format!("invalid log filter '{directive}'"))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init()
        .map_err(|err| anyhow!("installing log subscriber: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_variable_beats_rust_log() {
        let directive = filter_directive(
            Some("featurefence=debug".into()),
            Some("trace".into()),
            "warn",
        );
        assert_eq!(directive, "featurefence=debug");
    }

    #[test]
    fn blank_values_fall_through_to_default() {
        assert_eq!(
            filter_directive(Some(" ".into()), None, "warn"),
            "featurefence=warn"
        );
        assert_eq!(filter_directive(None, Some("info".into()), "warn"), "info");
    }
}
