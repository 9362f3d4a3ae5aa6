//! Span lifecycle utilities over message batches
//!
//! These functions apply the propagation discipline a pipeline stage needs
//! around the opaque span abstraction: every part of a message gets a span at
//! ingestion, per-part work is wrapped in a child span, and everything still
//! open is finished at egress. Iteration is always sequential in index order,
//! and a failing part never prevents the remaining parts' spans from being
//! finished.
//!
//! All utilities take the tracer handle explicitly rather than reaching for
//! ambient global state, so a recording fake can be injected in tests.

use tracing::debug;

use crate::message::{Message, Part};
use crate::tracing::span::{Span, SpanContext, SpanTracer};

/// Start a fresh root span named `operation_name` on every part,
/// unconditionally, and return the rebuilt message.
///
/// Any previously attached span reference is discarded, not finished: span
/// ownership stays with the stage that started it, and finishing here would
/// break the backend's finish-exactly-once contract whenever that stage also
/// finishes its span on return. Replacing a still-open span is logged at
/// debug level so an upstream leak is observable.
pub fn init_spans(tracer: &dyn SpanTracer, operation_name: &str, msg: Message) -> Message {
    let parts: Vec<Part> = msg
        .into_parts()
        .into_iter()
        .map(|part| {
            if part.span().is_some_and(|span| !span.is_finished()) {
                debug!(operation_name, "replacing an unfinished span on a message part");
            }
            let span = tracer.start_span(operation_name);
            part.with_span(span)
        })
        .collect();
    Message::new(parts)
}

/// Start a span named `operation_name` on every part as a child of the single
/// supplied `parent`, and return the rebuilt message.
///
/// This is the fan-out case: one causal origin, many parts. An invalid parent
/// context degrades to root-span creation for the whole batch rather than
/// failing it.
pub fn init_spans_from_parent(
    tracer: &dyn SpanTracer,
    parent: &SpanContext,
    operation_name: &str,
    msg: Message,
) -> Message {
    if !parent.is_valid() {
        debug!(
            operation_name,
            "parent span context is invalid, starting root spans instead"
        );
        return init_spans(tracer, operation_name, msg);
    }

    let parts: Vec<Part> = msg
        .into_parts()
        .into_iter()
        .map(|part| {
            if part.span().is_some_and(|span| !span.is_finished()) {
                debug!(operation_name, "replacing an unfinished span on a message part");
            }
            let span = tracer.start_child(operation_name, parent);
            part.with_span(span)
        })
        .collect();
    Message::new(parts)
}

/// Iterate all parts of a message and, for each part, start a new span as a
/// child of the part's currently attached span (a root span when none is
/// attached) and call `iter` with it.
///
/// Each started span is finished before the next part is visited, whatever
/// the callback returned, so no span opened here outlives this call. The
/// first error returned by any invocation becomes the overall result, but
/// iteration still proceeds through the remaining parts.
pub fn iterate_with_span<F, E>(
    tracer: &dyn SpanTracer,
    operation_name: &str,
    msg: &Message,
    mut iter: F,
) -> Result<(), E>
where
    F: FnMut(usize, &Span, &Part) -> Result<(), E>,
{
    let mut result = Ok(());
    for (i, part) in msg.iter().enumerate() {
        let span = match part.span() {
            Some(current) => tracer.start_child(operation_name, current.context()),
            None => tracer.start_span(operation_name),
        };
        let call = iter(i, &span, part);
        span.finish();
        if result.is_ok() {
            result = call;
        }
    }
    result
}

/// Finish the span of every part that has one attached; parts without a span
/// are skipped silently.
///
/// Used at pipeline egress (ack, drop, terminal output) so that no span
/// outlives its message. The span handle guards against a double finish
/// reaching the backend, but callers should not invoke this twice on an
/// unmodified message.
pub fn finish_spans(msg: &Message) {
    for part in msg.iter() {
        if let Some(span) = part.span() {
            span.finish();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Part;
    use crate::tracing::span::NoopTracer;

    fn three_parts() -> Message {
        (0..3).map(|i| Part::new(format!("part-{i}"))).collect()
    }

    #[test]
    fn test_init_spans_attaches_to_every_part() {
        let msg = init_spans(&NoopTracer, "ingest", three_parts());
        assert_eq!(msg.len(), 3);
        assert!(msg.iter().all(|p| p.span().is_some()));
    }

    #[test]
    fn test_iterate_with_span_visits_every_part() {
        let msg = three_parts();
        let mut visited = Vec::new();
        let result = iterate_with_span(&NoopTracer, "process", &msg, |i, _span, _part| {
            visited.push(i);
            Ok::<(), ()>(())
        });
        assert!(result.is_ok());
        assert_eq!(visited, vec![0, 1, 2]);
    }

    #[test]
    fn test_finish_spans_skips_bare_parts() {
        // Must not panic on parts that never had a span attached.
        finish_spans(&three_parts());
    }
}
