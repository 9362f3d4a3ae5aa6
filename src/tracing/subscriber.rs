//! Tracing subscriber setup with layered architecture
//!
//! Combines an `EnvFilter` (controlled via `RUST_LOG`), a fmt layer for
//! console output and, when a Jaeger provider is installed, an OpenTelemetry
//! layer that exports instrumentation spans through it.

use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::tracing::jaeger::Jaeger;

/// Subscriber initialization errors.
#[derive(Error, Debug)]
pub enum SubscriberError {
    #[error("failed to set global subscriber: {0}")]
    Init(String),
}

/// Initialize the global tracing subscriber.
///
/// Pass the installed [`Jaeger`] handle to also export instrumentation spans
/// through it; pass `None` for log output only. Fails if a global subscriber
/// was already set.
pub fn init_subscriber(jaeger: Option<&Jaeger>) -> Result<(), SubscriberError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);
    let registry = tracing_subscriber::registry().with(filter).with(fmt_layer);

    match jaeger.and_then(Jaeger::sdk_tracer) {
        Some(tracer) => registry
            .with(tracing_opentelemetry::layer().with_tracer(tracer))
            .try_init()
            .map_err(|err| SubscriberError::Init(err.to_string())),
        None => registry
            .try_init()
            .map_err(|err| SubscriberError::Init(err.to_string())),
    }
}
