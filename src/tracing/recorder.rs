//! In-memory span recorder
//!
//! [`RecordingTracer`] is a [`SpanTracer`] that keeps every started span in
//! memory instead of exporting it, so tests can assert on operation names,
//! parent/child links and finish counts without a tracing backend.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use uuid::Uuid;

use crate::tracing::span::{Span, SpanContext, SpanSink, SpanTracer};

/// Snapshot of one recorded span.
#[derive(Debug, Clone)]
pub struct RecordedSpan {
    /// Operation name the span was started with.
    pub operation_name: String,
    /// Context generated for the span. Children share their parent's
    /// trace id.
    pub context: SpanContext,
    /// Parent context, when the span was started as a child.
    pub parent: Option<SpanContext>,
    /// Number of times the finish operation reached this span.
    pub finish_count: usize,
}

struct RecordedEntry {
    operation_name: String,
    context: SpanContext,
    parent: Option<SpanContext>,
    finish_count: Arc<AtomicUsize>,
}

struct CountingSink {
    count: Arc<AtomicUsize>,
}

impl SpanSink for CountingSink {
    fn finish(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

/// Recording fake for the tracer provider contract.
///
/// Cloning yields a handle to the same underlying recording, so a test can
/// keep one clone for assertions while lending the other to the code under
/// test.
#[derive(Clone, Default)]
pub struct RecordingTracer {
    spans: Arc<Mutex<Vec<RecordedEntry>>>,
}

impl RecordingTracer {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, operation_name: &str, parent: Option<&SpanContext>) -> Span {
        let trace_id = match parent {
            Some(p) => p.trace_id().to_string(),
            None => Uuid::new_v4().simple().to_string(),
        };
        let span_id = Uuid::new_v4().simple().to_string()[..16].to_string();
        let context = SpanContext::new(trace_id, span_id, 0x01);

        let finish_count = Arc::new(AtomicUsize::new(0));
        let entry = RecordedEntry {
            operation_name: operation_name.to_string(),
            context: context.clone(),
            parent: parent.cloned(),
            finish_count: finish_count.clone(),
        };
        self.spans
            .lock()
            .expect("recorder lock poisoned")
            .push(entry);

        Span::new(context, Box::new(CountingSink { count: finish_count }))
    }

    /// Snapshot every recorded span in start order.
    pub fn spans(&self) -> Vec<RecordedSpan> {
        self.spans
            .lock()
            .expect("recorder lock poisoned")
            .iter()
            .map(|entry| RecordedSpan {
                operation_name: entry.operation_name.clone(),
                context: entry.context.clone(),
                parent: entry.parent.clone(),
                finish_count: entry.finish_count.load(Ordering::SeqCst),
            })
            .collect()
    }

    /// Snapshot the recorded spans started with `operation_name`.
    pub fn spans_named(&self, operation_name: &str) -> Vec<RecordedSpan> {
        self.spans()
            .into_iter()
            .filter(|span| span.operation_name == operation_name)
            .collect()
    }

    /// Number of spans started so far.
    pub fn started_count(&self) -> usize {
        self.spans.lock().expect("recorder lock poisoned").len()
    }

    /// Number of spans that have been finished at least once.
    pub fn finished_count(&self) -> usize {
        self.spans()
            .into_iter()
            .filter(|span| span.finish_count > 0)
            .count()
    }
}

impl SpanTracer for RecordingTracer {
    fn start_span(&self, operation_name: &str) -> Span {
        self.record(operation_name, None)
    }

    fn start_child(&self, operation_name: &str, parent: &SpanContext) -> Span {
        self.record(operation_name, Some(parent))
    }
}
