//! Logging setup for the kiln CLI.
//!
//! The library crates emit `tracing` events; this module installs the
//! subscriber that renders them on stderr.
//!
//! # Example
//!
//! ```rust,no_run
//! use kiln_cli::logger::init_logger;
//!
//! init_logger(false, false, false, None);
//! tracing::info!("loading aspect output");
//! ```

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const KILN_CRATES: [&str; 4] = ["kiln_graph", "kiln_classpath", "kiln_config", "kiln_cli"];

/// Initialize the global tracing subscriber.
///
/// The filter is picked in this order:
/// 1. `--verbose`: debug for the kiln crates
/// 2. `--quiet`: errors only
/// 3. `RUST_LOG`
/// 4. `settings.log_level` from `kiln.toml`
/// 5. info for the kiln crates
///
/// Must be called at most once per process.
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool, configured_level: Option<&str>) {
    init_logger_with_filter(build_filter(verbose, quiet, configured_level), no_color);
}

/// Initialize with an explicit filter.
pub fn init_logger_with_filter(filter: EnvFilter, no_color: bool) {
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color)
        .compact();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

pub fn build_filter(verbose: bool, quiet: bool, configured_level: Option<&str>) -> EnvFilter {
    if verbose {
        EnvFilter::new(directives("debug"))
    } else if quiet {
        EnvFilter::new("error")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            let level = configured_level.unwrap_or("info").to_ascii_lowercase();
            EnvFilter::new(directives(&level))
        })
    }
}

/// `warn` for everything else, `level` for the kiln crates.
fn directives(level: &str) -> String {
    let mut directives = String::from("warn");
    for krate in KILN_CRATES {
        directives.push(',');
        directives.push_str(krate);
        directives.push('=');
        directives.push_str(level);
    }
    directives
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn directives_cover_every_kiln_crate() {
        assert_eq!(
            directives("debug"),
            "warn,kiln_graph=debug,kiln_classpath=debug,kiln_config=debug,kiln_cli=debug"
        );
    }

    #[test]
    #[serial]
    fn verbose_wins_over_quiet_and_config() {
        let filter = build_filter(true, true, Some("error"));
        assert!(filter.to_string().contains("kiln_cli=debug"));
    }

    #[test]
    #[serial]
    fn configured_level_applies_without_rust_log() {
        unsafe {
            std::env::remove_var("RUST_LOG");
        }
        let filter = build_filter(false, false, Some("TRACE"));
        assert!(filter.to_string().contains("kiln_graph=trace"));

        let quiet = build_filter(false, true, Some("trace"));
        assert!(!quiet.to_string().contains("trace"));
    }
}
