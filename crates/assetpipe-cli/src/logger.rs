//! Logging setup for the assetpipe CLI.
//!
//! Libraries log through `tracing`; the CLI installs the subscriber once at
//! startup. Builder output lines (`[esbuild] ...`, `[tailwind] ...`) are
//! info events, so `--quiet` hides them.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const VERBOSE_FILTER: &str = "assetpipe_core=debug,assetpipe_builders=debug,assetpipe_cli=debug";
const DEFAULT_FILTER: &str = "assetpipe_core=info,assetpipe_builders=info,assetpipe_cli=info";
const QUIET_FILTER: &str = "error";

/// Filter for the given flags.
///
/// Priority: `--verbose`, then `--quiet`, then `RUST_LOG`, then info for
/// the assetpipe crates.
pub fn env_filter(verbose: bool, quiet: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else if quiet {
        EnvFilter::new(QUIET_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}

/// Initialize the tracing subscriber. Call once, before any logging.
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    init_logger_with_filter(env_filter(verbose, quiet), no_color);
}

/// Initialize the tracing subscriber with a custom filter.
pub fn init_logger_with_filter(filter: EnvFilter, no_color: bool) {
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color)
        .with_writer(std::io::stderr)
        .compact();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}
