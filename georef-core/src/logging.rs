//! Logging setup for the georef binary.
//!
//! Logs always go to stderr so stdout only carries the run summary.

use crate::Result;

/// Maps CLI verbosity flags onto a tracing level.
///
/// quiet wins over any `-v` count.
pub const fn level_for(verbose: u8, quiet: bool) -> tracing::Level {
    match (quiet, verbose) {
        (true, _) => tracing::Level::ERROR,
        (false, 0) => tracing::Level::INFO,
        (false, 1) => tracing::Level::DEBUG,
        (false, _) => tracing::Level::TRACE,
    }
}

/// Installs the global stderr subscriber at [`level_for`]`(verbose, quiet)`.
///
/// Call once, before the first connection is opened.
///
/// # Errors
/// Returns a configuration error if a subscriber is already installed.
pub fn init_logging(verbose: u8, quiet: bool) -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(level_for(verbose, quiet))
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init()
        .map_err(|e| {
            crate::error::GeoRefError::configuration(format!("Logging already initialised: {}", e))
        })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // The global subscriber can only be installed once per process, so only
    // the level mapping is exercised here.
    #[test]
    fn test_verbosity_levels() {
        let cases = [
            ((true, 0), tracing::Level::ERROR),
            ((true, 5), tracing::Level::ERROR),
            ((false, 0), tracing::Level::INFO),
            ((false, 1), tracing::Level::DEBUG),
            ((false, 2), tracing::Level::TRACE),
            ((false, 10), tracing::Level::TRACE),
        ];

        for ((quiet, verbose), expected) in cases {
            assert_eq!(
                level_for(verbose, quiet),
                expected,
                "quiet={} verbose={}",
                quiet,
                verbose
            );
        }
    }
}
