//! Span carrier primitives
//!
//! The types here keep tracing opaque to transport code. A [`Span`] is a
//! cloneable, non-owning handle to a span started by some backend; a
//! [`SpanCarrier`] attaches at most one of them to a message part; a
//! [`SpanContext`] is the serializable reference (trace id, span id, flags)
//! that crosses process and module boundaries, formatted as a W3C
//! `traceparent` value on the wire.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const INVALID_TRACE_ID: &str = "00000000000000000000000000000000";
const INVALID_SPAN_ID: &str = "0000000000000000";

/// Serializable reference to a span, usable across a wire boundary.
///
/// Format on the wire is the W3C `traceparent` header value:
/// `00-{trace-id}-{span-id}-{trace-flags}` with a 32-hex-char trace id and a
/// 16-hex-char span id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpanContext {
    trace_id: String,
    span_id: String,
    trace_flags: u8,
}

impl SpanContext {
    /// Create a context from its components. Ids are expected to be lowercase
    /// hex; validity can be checked with [`SpanContext::is_valid`].
    pub fn new(trace_id: impl Into<String>, span_id: impl Into<String>, trace_flags: u8) -> Self {
        Self {
            trace_id: trace_id.into(),
            span_id: span_id.into(),
            trace_flags,
        }
    }

    /// The all-zero context reported by no-op spans.
    pub fn invalid() -> Self {
        Self::new(INVALID_TRACE_ID, INVALID_SPAN_ID, 0)
    }

    /// Trace ID (32 hex characters when valid).
    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    /// Span ID (16 hex characters when valid).
    pub fn span_id(&self) -> &str {
        &self.span_id
    }

    /// The 8-bit trace flags field.
    pub fn trace_flags(&self) -> u8 {
        self.trace_flags
    }

    /// Whether the sampled flag (bit 0) is set.
    pub fn is_sampled(&self) -> bool {
        (self.trace_flags & 0x01) != 0
    }

    /// A context is valid when both ids are well-formed hex and at least one
    /// byte of each is non-zero.
    pub fn is_valid(&self) -> bool {
        is_hex_id(&self.trace_id, 32)
            && is_hex_id(&self.span_id, 16)
            && self.trace_id != INVALID_TRACE_ID
            && self.span_id != INVALID_SPAN_ID
    }

    /// Format as a `traceparent` header value.
    pub fn to_traceparent(&self) -> String {
        format!(
            "00-{}-{}-{:02x}",
            self.trace_id, self.span_id, self.trace_flags
        )
    }

    /// Parse a `traceparent` header value. Returns `None` for anything that
    /// is not a well-formed version-00 value with valid ids.
    pub fn from_traceparent(value: &str) -> Option<Self> {
        let parts: Vec<&str> = value.trim().split('-').collect();
        if parts.len() != 4 || parts[0] != "00" {
            return None;
        }
        if !is_hex_id(parts[1], 32) || !is_hex_id(parts[2], 16) {
            return None;
        }
        let trace_flags = u8::from_str_radix(parts[3], 16).ok()?;

        let context = Self::new(parts[1].to_lowercase(), parts[2].to_lowercase(), trace_flags);
        context.is_valid().then_some(context)
    }

    /// Extract a context from a string-keyed header map (case-insensitive
    /// `traceparent` lookup). Absence or malformed input yields `None`.
    pub fn from_headers(headers: &HashMap<String, String>) -> Option<Self> {
        headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("traceparent"))
            .and_then(|(_, v)| Self::from_traceparent(v))
    }

    /// Inject this context into a string-keyed header map.
    pub fn inject_headers(&self, headers: &mut HashMap<String, String>) {
        headers.insert("traceparent".to_string(), self.to_traceparent());
    }
}

fn is_hex_id(s: &str, len: usize) -> bool {
    s.len() == len && s.chars().all(|c| c.is_ascii_hexdigit())
}

/// Backend hook invoked exactly once when a span is finished.
pub trait SpanSink: Send + Sync {
    /// Release the underlying span. Called at most once per span.
    fn finish(&self);
}

struct NoopSink;

impl SpanSink for NoopSink {
    fn finish(&self) {}
}

struct SpanInner {
    context: SpanContext,
    finished: AtomicBool,
    sink: Box<dyn SpanSink>,
}

/// Non-owning handle to a started span.
///
/// The span itself is owned by the tracer backend; this handle only exposes
/// its context and the one-shot finish operation. Cloning the handle does not
/// duplicate the span: all clones observe the same finished state, and only
/// the first [`Span::finish`] call reaches the backend.
#[derive(Clone)]
pub struct Span {
    inner: Arc<SpanInner>,
}

impl Span {
    /// Wrap a backend span. `sink` receives exactly one `finish` call over
    /// the lifetime of the handle and all of its clones.
    pub fn new(context: SpanContext, sink: Box<dyn SpanSink>) -> Self {
        Self {
            inner: Arc::new(SpanInner {
                context,
                finished: AtomicBool::new(false),
                sink,
            }),
        }
    }

    /// An inert span with an invalid context.
    pub fn noop() -> Self {
        Self::new(SpanContext::invalid(), Box::new(NoopSink))
    }

    /// The span's serializable context, used to start children of it.
    pub fn context(&self) -> &SpanContext {
        &self.inner.context
    }

    /// Finish the span. Only the first call reaches the backend; later calls
    /// are no-ops, keeping the backend's finish-exactly-once contract intact
    /// even when multiple clones of the handle exist.
    pub fn finish(&self) {
        if !self.inner.finished.swap(true, Ordering::AcqRel) {
            self.inner.sink.finish();
        }
    }

    /// Whether [`Span::finish`] has been called on this span.
    pub fn is_finished(&self) -> bool {
        self.inner.finished.load(Ordering::Acquire)
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Span")
            .field("context", &self.inner.context)
            .field("finished", &self.is_finished())
            .finish()
    }
}

/// Optional span attached to a message part.
///
/// "No span yet started" is a distinguishable, first-class state; asking an
/// empty carrier for its span returns `None` and never panics.
#[derive(Debug, Clone, Default)]
pub struct SpanCarrier {
    span: Option<Span>,
}

impl SpanCarrier {
    /// A carrier holding no span.
    pub fn empty() -> Self {
        Self { span: None }
    }

    /// A carrier holding `span`.
    pub fn with_span(span: Span) -> Self {
        Self { span: Some(span) }
    }

    /// The held span, if any.
    pub fn span(&self) -> Option<&Span> {
        self.span.as_ref()
    }

    /// Whether the carrier holds no span.
    pub fn is_empty(&self) -> bool {
        self.span.is_none()
    }
}

/// The tracer provider contract.
///
/// Span creation is total: implementations always return a usable handle,
/// never block beyond in-memory bookkeeping, and are safe to call from any
/// number of threads concurrently. A tracer that cannot create real spans
/// degrades to no-op spans rather than failing.
pub trait SpanTracer: Send + Sync {
    /// Start a new root span.
    fn start_span(&self, operation_name: &str) -> Span;

    /// Start a new span as a child of `parent`. Implementations fall back to
    /// root-span creation when `parent` is invalid.
    fn start_child(&self, operation_name: &str, parent: &SpanContext) -> Span;
}

/// Tracer producing inert spans; the degraded fallback when no backend is
/// configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracer;

impl SpanTracer for NoopTracer {
    fn start_span(&self, _operation_name: &str) -> Span {
        Span::noop()
    }

    fn start_child(&self, _operation_name: &str, _parent: &SpanContext) -> Span {
        Span::noop()
    }
}
