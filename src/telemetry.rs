//! Structured logging setup shared by both binaries.
//!
//! `RUST_LOG` wins over the configured level. Production emits JSON lines
//! for log aggregation, everything else a human-readable format.

use std::io;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Environment;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    pub fn for_environment(environment: &Environment) -> Self {
        match environment {
            Environment::Production => LogFormat::Json,
            Environment::Development | Environment::Staging => LogFormat::Pretty,
        }
    }
}

/// Installs the global subscriber. Call once, first thing in `main`.
pub fn init(default_level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Pretty => registry
            .with(fmt::layer().with_target(true).with_writer(io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_target(true)
                    .with_writer(io::stderr),
            )
            .init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn production_logs_json() {
        assert_eq!(LogFormat::for_environment(&Environment::Production), LogFormat::Json);
        assert_eq!(LogFormat::for_environment(&Environment::Staging), LogFormat::Pretty);
        assert_eq!(LogFormat::for_environment(&Environment::Development), LogFormat::Pretty);
    }
}
