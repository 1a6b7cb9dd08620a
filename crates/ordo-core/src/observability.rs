//! Logging setup for processes that embed the orderer.
//!
//! The engine only emits `tracing` events. Hosts pick an output format with
//! [`LogFormat`] (optionally from `ORDO_LOG_FORMAT`) and install a subscriber
//! with [`init_logging`]. Rollback checks run under [`history_span`].

use std::str::FromStr;
use std::sync::Once;

use tracing::Span;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::{Error, Result};

const ENV_LOG_FORMAT: &str = "ORDO_LOG_FORMAT";

/// Filter used when `RUST_LOG` is unset: engine decisions at `info`,
/// everything else at `warn`.
pub const DEFAULT_DIRECTIVES: &str = "warn,ordo_core=info,ordo_sort=info";

static INIT: Once = Once::new();

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per event.
    Json,
    /// Multi-line human-readable output.
    #[default]
    Pretty,
}

impl LogFormat {
    /// Reads `ORDO_LOG_FORMAT` through `get_env`, defaulting to pretty output.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for values other than `json` or `pretty`.
    pub fn from_env_with<F>(get_env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        get_env(ENV_LOG_FORMAT).map_or(Ok(Self::default()), |raw| raw.parse())
    }
}

impl FromStr for LogFormat {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            other => Err(Error::configuration(format!(
                "{ENV_LOG_FORMAT} must be json or pretty; got '{other}'"
            ))),
        }
    }
}

/// Installs a global subscriber writing in `format`.
///
/// `RUST_LOG` overrides [`DEFAULT_DIRECTIVES`]. Only the first call has an
/// effect, and an already installed subscriber is left in place.
///
/// # Example
///
/// ```rust
/// use ordo_core::observability::{init_logging, LogFormat};
///
/// init_logging(LogFormat::Json);
/// ```
pub fn init_logging(format: LogFormat) {
    INIT.call_once(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));
        let output = match format {
            LogFormat::Json => fmt::layer().json().with_current_span(true).boxed(),
            LogFormat::Pretty => fmt::layer().pretty().boxed(),
        };

        let _ = tracing_subscriber::registry()
            .with(output)
            .with(env_filter)
            .try_init();
    });
}

/// Creates the span a schema's rollback check runs under.
#[must_use]
pub fn history_span(schema: &str, product_version: &str) -> Span {
    tracing::info_span!("history", schema = schema, product_version = product_version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_defaults_to_pretty() -> Result<()> {
        assert_eq!(LogFormat::from_env_with(|_| None)?, LogFormat::Pretty);
        Ok(())
    }

    #[test]
    fn log_format_parses_from_env() -> Result<()> {
        let format = LogFormat::from_env_with(|key| {
            (key == ENV_LOG_FORMAT).then(|| " JSON ".to_string())
        })?;
        assert_eq!(format, LogFormat::Json);
        Ok(())
    }

    #[test]
    fn unknown_log_format_is_a_configuration_error() {
        let err = "xml".parse::<LogFormat>().unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
        assert!(err.to_string().contains("ORDO_LOG_FORMAT"));
    }

    #[test]
    fn init_logging_is_idempotent() {
        init_logging(LogFormat::Pretty);
        init_logging(LogFormat::Json);
    }

    #[test]
    fn history_span_carries_schema() {
        let span = history_span("schema1", "2.0.0");
        let _guard = span.enter();
        tracing::debug!("reading executions");
    }
}
