//! Diagnostic logging on stderr.

use tracing_subscriber::EnvFilter;

/// Filter used when neither a flag nor `RUST_LOG` asks for something else.
const DEFAULT_DIRECTIVE: &str = "warn";

/// Chooses the log filter. Explicit flags win over `RUST_LOG`.
pub fn filter(quiet: bool, verbose: bool) -> EnvFilter {
    if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
    }
}

/// Installs the global stderr subscriber.
pub fn init(quiet: bool, verbose: bool) {
    // A second installation (as in tests) is not an error worth reporting.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(quiet, verbose))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_environment() {
        assert_eq!(filter(true, false).to_string(), "error");
        assert_eq!(filter(false, true).to_string(), "debug");
    }
}
