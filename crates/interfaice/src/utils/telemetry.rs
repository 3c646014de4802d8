//! Process-wide log output for prompts, answers and decode failures.

use std::sync::OnceLock;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "interfaice=debug";

static SUBSCRIBER_INSTALLED: OnceLock<()> = OnceLock::new();

/// Why log output could not be set up.
#[derive(Debug, Error)]
pub enum TelemetryInitError {
    /// The fallback used when `RUST_LOG` is absent does not parse.
    #[error("fallback log filter `{fallback}` does not parse: {source}")]
    BadFallbackFilter {
        fallback: String,
        source: tracing_subscriber::filter::ParseError,
    },
    /// Something other than interfaice already owns the global subscriber.
    #[error("another global tracing subscriber is already installed")]
    SubscriberTaken(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Installs pretty tracing output filtered by `RUST_LOG`, falling back to
/// [`DEFAULT_FILTER`]. Repeated calls are no-ops.
pub fn init_tracing() -> Result<(), TelemetryInitError> {
    init_tracing_with(DEFAULT_FILTER)
}

/// Same as [`init_tracing`] with a caller-chosen fallback directive, e.g.
/// `"interfaice=trace"` to also see raw answers.
pub fn init_tracing_with(fallback: &str) -> Result<(), TelemetryInitError> {
    if SUBSCRIBER_INSTALLED.get().is_some() {
        return Ok(());
    }

    let subscriber = tracing_subscriber::fmt()
        .pretty()
        .with_env_filter(resolve_filter(fallback)?)
        .with_target(false)
        .with_thread_names(true)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    let _ = SUBSCRIBER_INSTALLED.set(());
    Ok(())
}

fn resolve_filter(fallback: &str) -> Result<EnvFilter, TelemetryInitError> {
    EnvFilter::try_from_default_env().or_else(|_| {
        EnvFilter::try_new(fallback).map_err(|source| TelemetryInitError::BadFallbackFilter {
            fallback: fallback.to_string(),
            source,
        })
    })
}

/// First `max_chars` characters of `value`, cut on a char boundary.
pub fn truncate(value: &str, max_chars: usize) -> &str {
    match value.char_indices().nth(max_chars) {
        Some((cutoff, _)) => &value[..cutoff],
        None => value,
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("Seoul", 10, "Seoul")]
    #[case("Seoul", 3, "Seo")]
    #[case("서울특별시", 2, "서울")]
    #[case("", 0, "")]
    fn test_truncate(#[case] value: &str, #[case] max_chars: usize, #[case] expected: &str) {
        assert_eq!(truncate(value, max_chars), expected);
    }

    #[test]
    fn test_invalid_fallback_directive() {
        // Only checked when RUST_LOG does not already provide a filter.
        if std::env::var("RUST_LOG").is_err() {
            let err = resolve_filter("interfaice=loudest").unwrap_err();
            assert!(matches!(err, TelemetryInitError::BadFallbackFilter { .. }));
        }
    }
}
