//! Tracing subscriber setup.
//!
//! The engine itself only emits `tracing` events and spans. Binaries and
//! tests call one of these once to see them.

use tracing_subscriber::EnvFilter;

fn env_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}

/// Installs a human-readable subscriber filtered by `RUST_LOG`, falling back
/// to `default_filter` (for example `"nodeflow=info,warn"`).
///
/// Returns false if a global subscriber was already installed.
pub fn init_tracing(default_filter: &str) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_filter))
        .with_target(false)
        .try_init()
        .is_ok()
}

/// Installs a JSON subscriber, one object per line, for log shippers.
///
/// Returns false if a global subscriber was already installed.
pub fn init_json_tracing(default_filter: &str) -> bool {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(env_filter(default_filter))
        .with_current_span(true)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init_tracing("nodeflow=debug");
        assert!(!init_tracing("nodeflow=debug"));
        assert!(!init_json_tracing("nodeflow=debug"));
    }
}
