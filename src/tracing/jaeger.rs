//! Jaeger tracer provider
//!
//! Installs a process-wide OpenTelemetry tracer provider that reports spans
//! to a Jaeger agent over UDP. The provider moves through three states:
//! unconfigured, configured (after [`Jaeger::install`]) and closed (after
//! [`Jaeger::close`]). Closing is idempotent and there is no way back to the
//! configured state; a fresh install is required, mirroring "one tracer per
//! process lifetime".
//!
//! [`OtelTracer`] bridges the installed provider to the [`SpanTracer`]
//! contract used by the lifecycle utilities.

use std::sync::Mutex;

use opentelemetry::global::{self, BoxedSpan, BoxedTracer};
use opentelemetry::trace::{
    Span as _, SpanContext as OtelSpanContext, SpanId, TraceContextExt, TraceFlags, TraceId,
    TraceState, Tracer as _, TracerProvider as _,
};
use opentelemetry::Context;
use opentelemetry_sdk::trace as sdktrace;
use tracing::{info, warn};

use crate::config::{parse_duration, ConfigError, JaegerConfig};
use crate::tracing::span::{Span, SpanContext, SpanSink, SpanTracer};

/// Handle to the installed Jaeger tracer provider.
///
/// Dropping the handle closes the provider, flushing buffered spans first.
#[derive(Debug)]
pub struct Jaeger {
    provider: Option<sdktrace::TracerProvider>,
}

impl Jaeger {
    /// One-time process-wide initialization.
    ///
    /// Builds a batch exporter pipeline targeting the configured agent,
    /// applies the static sampling probability and optional flush interval,
    /// and installs the resulting provider as the process default. Must be
    /// called from within a tokio runtime; the exporter runs on it.
    pub fn install(config: &JaegerConfig) -> Result<Jaeger, ConfigError> {
        config.validate()?;

        let sampler = sdktrace::Sampler::TraceIdRatioBased(config.span_sample);
        let mut pipeline = opentelemetry_jaeger::new_agent_pipeline()
            .with_service_name(config.service_name.clone())
            .with_trace_config(sdktrace::Config::default().with_sampler(sampler));

        if !config.agent_address.is_empty() {
            pipeline = pipeline.with_endpoint(config.agent_address.as_str());
        }

        if let Some(ref interval) = config.flush_interval {
            let flush =
                parse_duration(interval).map_err(|reason| ConfigError::InvalidDuration {
                    field: "flush_interval",
                    value: interval.clone(),
                    reason,
                })?;
            pipeline = pipeline.with_batch_processor_config(
                sdktrace::BatchConfig::default().with_scheduled_delay(flush),
            );
        }

        let provider = pipeline
            .build_batch(opentelemetry_sdk::runtime::Tokio)
            .map_err(|err| ConfigError::TracerInstall(err.to_string()))?;

        let _ = global::set_tracer_provider(provider.clone());

        info!(
            agent_address = %config.agent_address,
            service_name = %config.service_name,
            span_sample = config.span_sample,
            "installed jaeger tracer provider"
        );
        Ok(Jaeger {
            provider: Some(provider),
        })
    }

    /// Whether the provider is still configured (not yet closed).
    pub fn is_active(&self) -> bool {
        self.provider.is_some()
    }

    /// A `tracing-opentelemetry`-compatible tracer from the held provider,
    /// for wiring the log subscriber. `None` once closed.
    pub fn sdk_tracer(&self) -> Option<sdktrace::Tracer> {
        self.provider
            .as_ref()
            .map(|provider| provider.tracer("spanline"))
    }

    /// Flush buffered spans and release transport resources. Idempotent:
    /// the close handle is cleared on first use and later calls are no-ops.
    pub fn close(&mut self) {
        if let Some(provider) = self.provider.take() {
            for result in provider.force_flush() {
                if let Err(err) = result {
                    warn!(error = %err, "failed to flush spans during shutdown");
                }
            }
            global::shutdown_tracer_provider();
        }
    }
}

impl Drop for Jaeger {
    fn drop(&mut self) {
        self.close();
    }
}

/// [`SpanTracer`] backed by the globally installed OpenTelemetry provider.
///
/// Creation is total: when no provider is installed the global no-op
/// provider yields inert spans, so callers never need to handle a failed
/// start.
pub struct OtelTracer {
    tracer: BoxedTracer,
}

impl OtelTracer {
    /// Bind to whatever provider is currently installed process-wide.
    pub fn new() -> Self {
        Self {
            tracer: global::tracer("spanline"),
        }
    }
}

impl Default for OtelTracer {
    fn default() -> Self {
        Self::new()
    }
}

struct OtelSink {
    span: Mutex<Option<BoxedSpan>>,
}

impl SpanSink for OtelSink {
    fn finish(&self) {
        if let Ok(mut guard) = self.span.lock() {
            if let Some(mut span) = guard.take() {
                span.end();
            }
        }
    }
}

fn wrap(span: BoxedSpan) -> Span {
    let sc = span.span_context();
    let context = SpanContext::new(
        sc.trace_id().to_string(),
        sc.span_id().to_string(),
        sc.trace_flags().to_u8(),
    );
    Span::new(
        context,
        Box::new(OtelSink {
            span: Mutex::new(Some(span)),
        }),
    )
}

fn remote_parent(parent: &SpanContext) -> Option<Context> {
    let trace_id = TraceId::from_hex(parent.trace_id()).ok()?;
    let span_id = SpanId::from_hex(parent.span_id()).ok()?;
    let sc = OtelSpanContext::new(
        trace_id,
        span_id,
        TraceFlags::new(parent.trace_flags()),
        true,
        TraceState::default(),
    );
    sc.is_valid().then(|| Context::new().with_remote_span_context(sc))
}

impl SpanTracer for OtelTracer {
    fn start_span(&self, operation_name: &str) -> Span {
        // An empty context forces a root span regardless of the thread's
        // current otel context.
        wrap(
            self.tracer
                .start_with_context(operation_name.to_string(), &Context::new()),
        )
    }

    fn start_child(&self, operation_name: &str, parent: &SpanContext) -> Span {
        match remote_parent(parent) {
            Some(cx) => wrap(self.tracer.start_with_context(operation_name.to_string(), &cx)),
            None => self.start_span(operation_name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_parent_rejects_invalid_ids() {
        assert!(remote_parent(&SpanContext::invalid()).is_none());
        assert!(remote_parent(&SpanContext::new("not-hex", "also-not", 1)).is_none());
        assert!(remote_parent(&SpanContext::new(
            "0af7651916cd43dd8448eb211c80319c",
            "b7ad6b7169203331",
            1
        ))
        .is_some());
    }

    #[test]
    fn test_unconfigured_global_yields_usable_spans() {
        // Without an installed provider, span creation must still be total.
        let tracer = OtelTracer::new();
        let span = tracer.start_span("orphan");
        span.finish();
        assert!(span.is_finished());
    }
}
