//! `tracing` setup for the `pgshard` binary and the revision span.
//!
//! Logs go to stderr so that `makemigrations --dry-run` output on stdout
//! stays a clean SQL script.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::settings::Settings;

/// Filter used when `log_level` cannot be parsed.
pub const FALLBACK_FILTER: &str = "info";

/// How log lines are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line, human-readable, with source locations.
    Pretty,
    /// One JSON object per line, including the current span.
    Json,
}

impl LogFormat {
    /// Pretty in debug mode, JSON otherwise.
    pub const fn for_settings(settings: &Settings) -> Self {
        if settings.debug {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

/// Builds the filter from `settings.log_level`, e.g. `"debug"` or
/// `"pgshard_migrations=debug,info"`.
pub fn log_filter(settings: &Settings) -> EnvFilter {
    EnvFilter::try_new(&settings.log_level).unwrap_or_else(|e| {
        eprintln!(
            "Invalid log_level '{}' ({e}); using '{FALLBACK_FILTER}'",
            settings.log_level
        );
        EnvFilter::new(FALLBACK_FILTER)
    })
}

/// Installs the global subscriber.
///
/// Returns `false` if a subscriber was already installed, in which case the
/// existing one stays in place.
pub fn setup_logging(settings: &Settings) -> bool {
    let registry = tracing_subscriber::registry().with(log_filter(settings));
    let installed = match LogFormat::for_settings(settings) {
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .pretty()
                    .with_file(true)
                    .with_line_number(true)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };
    installed.is_ok()
}

/// The span wrapping one revision's generation; every event logged while
/// it is entered carries the revision id.
///
/// ```
/// use pgshard_core::logging::revision_span;
///
/// let _guard = revision_span("0004_add_orders").entered();
/// tracing::info!("splicing shard DDL");
/// ```
pub fn revision_span(revision_id: &str) -> tracing::Span {
    tracing::info_span!("revision", id = revision_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(debug: bool, log_level: &str) -> Settings {
        Settings {
            debug,
            log_level: log_level.to_string(),
            ..Settings::default()
        }
    }

    #[test]
    fn test_format_follows_debug_flag() {
        assert_eq!(LogFormat::for_settings(&settings(true, "info")), LogFormat::Pretty);
        assert_eq!(LogFormat::for_settings(&settings(false, "info")), LogFormat::Json);
    }

    #[test]
    fn test_filter_uses_log_level() {
        let filter = log_filter(&settings(false, "pgshard_migrations=debug"));
        assert_eq!(filter.to_string(), "pgshard_migrations=debug");
    }

    #[test]
    fn test_invalid_log_level_falls_back() {
        let filter = log_filter(&settings(false, "pgshard=verbose"));
        assert_eq!(filter.to_string(), FALLBACK_FILTER);
    }

    #[test]
    fn test_second_install_is_refused() {
        let s = settings(false, "warn");
        setup_logging(&s);
        assert!(!setup_logging(&s));
    }

    #[test]
    fn test_revision_span_name() {
        let span = revision_span("0001_initial");
        if let Some(meta) = span.metadata() {
            assert_eq!(meta.name(), "revision");
        }
    }
}
