//! Distributed tracing for message batches
//!
//! The pieces fit together as follows:
//!
//! - [`span`] holds the per-part primitives: an opaque [`span::Span`] handle,
//!   the [`span::SpanCarrier`] attached to every part, the serializable
//!   [`span::SpanContext`] and the [`span::SpanTracer`] provider contract.
//! - [`lifecycle`] applies the propagation discipline over whole messages:
//!   initialise spans at ingestion, wrap per-part work in child spans, and
//!   finish everything at egress.
//! - [`jaeger`] configures a process-wide OpenTelemetry provider targeting a
//!   Jaeger agent and bridges it to the `SpanTracer` contract.
//! - [`recorder`] is an in-memory tracer for tests.
//! - [`subscriber`] wires the `tracing` log subscriber, optionally exporting
//!   instrumentation spans through the installed provider.

pub mod jaeger;
pub mod lifecycle;
pub mod recorder;
pub mod span;
pub mod subscriber;

pub use jaeger::{Jaeger, OtelTracer};
pub use lifecycle::{finish_spans, init_spans, init_spans_from_parent, iterate_with_span};
pub use recorder::RecordingTracer;
pub use span::{NoopTracer, Span, SpanCarrier, SpanContext, SpanTracer};
pub use subscriber::init_subscriber;
