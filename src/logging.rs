//! Diagnostic logging setup.
//!
//! Logs go to stderr so stdout carries only results. `RUST_LOG` takes
//! precedence over the verbosity flags.

use tracing_subscriber::EnvFilter;

fn default_directive(verbose: bool, quiet: bool) -> &'static str {
    match (verbose, quiet) {
        (true, _) => "netsweep=debug",
        (false, true) => "netsweep=warn",
        (false, false) => "netsweep=info",
    }
}

/// Install the global subscriber. Safe to call more than once.
pub fn init(verbose: bool, quiet: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose, quiet)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(default_directive(false, false), "netsweep=info");
        assert_eq!(default_directive(true, false), "netsweep=debug");
        assert_eq!(default_directive(false, true), "netsweep=warn");
        assert_eq!(default_directive(true, true), "netsweep=debug");
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init(false, true);
        init(true, false);
    }
}
