//! Tracing subscriber setup for the binary.
//!
//! Library code only emits `tracing` events; installing a subscriber is
//! left to the executable.

use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

/// Environment variable holding the filter directives.
pub const LOG_ENV: &str = "BLOGDESK_LOG";

/// Directives used when `BLOGDESK_LOG` is unset or invalid.
pub const DEFAULT_DIRECTIVES: &str = "blogdesk=info";

/// Build the event filter. `verbose` forces debug output for this crate.
pub fn build_filter(verbose: bool) -> EnvFilter {
    if verbose {
        return EnvFilter::new("blogdesk=debug");
    }
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES))
}

/// Install the global subscriber, writing to stderr.
///
/// Calling this twice is harmless; the second call is ignored.
pub fn init_tracing(verbose: bool) {
    let result = tracing_subscriber::registry()
        .with(build_filter(verbose))
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();

    if result.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_default_filter() {
        std::env::remove_var(LOG_ENV);
        assert_eq!(build_filter(false).to_string(), DEFAULT_DIRECTIVES);
    }

    #[test]
    #[serial]
    fn test_filter_from_env() {
        std::env::set_var(LOG_ENV, "blogdesk=trace");
        let filter = build_filter(false);
        std::env::remove_var(LOG_ENV);
        assert_eq!(filter.to_string(), "blogdesk=trace");
    }

    #[test]
    #[serial]
    fn test_verbose_overrides_env() {
        std::env::set_var(LOG_ENV, "blogdesk=warn");
        let filter = build_filter(true);
        std::env::remove_var(LOG_ENV);
        assert_eq!(filter.to_string(), "blogdesk=debug");
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init_tracing(false);
        init_tracing(false);
    }
}
