//! Tracing subscriber setup.
//!
//! Progress, skip and failure notices go to stderr so `run --json` keeps
//! stdout machine-readable. `RUST_LOG` wins over the verbosity flags.

use tracing_subscriber::EnvFilter;

/// Filter directive for the `-q` / `-v` flags.
pub fn default_level(quiet: bool, verbose: u8) -> &'static str {
    if quiet {
        return "warn";
    }
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Initialize the global subscriber. Later calls are no-ops.
pub fn init(quiet: bool, verbose: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level(quiet, verbose)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose > 0)
        .try_init()
        .ok();
}
