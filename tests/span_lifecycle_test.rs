//! Integration tests for the span lifecycle utilities
//!
//! Uses the in-memory recording tracer so parent/child links and finish
//! counts are observable without a backend.

use spanline::message::{Message, Part};
use spanline::tracing::recorder::RecordingTracer;
use spanline::tracing::span::{NoopTracer, SpanContext};
use spanline::tracing::{finish_spans, init_spans, init_spans_from_parent, iterate_with_span};

fn message_with_parts(n: usize) -> Message {
    (0..n).map(|i| Part::new(format!("part-{i}"))).collect()
}

#[test]
fn test_init_then_finish_closes_every_span_once() {
    let tracer = RecordingTracer::new();
    let msg = init_spans(&tracer, "x", message_with_parts(4));

    finish_spans(&msg);

    let recorded = tracer.spans_named("x");
    assert_eq!(recorded.len(), 4);
    for span in &recorded {
        assert_eq!(span.finish_count, 1);
    }
    for part in msg.iter() {
        let span = part.span().expect("span attached");
        assert!(span.is_finished());
    }
}

#[test]
fn test_init_spans_from_parent_links_every_child() {
    let tracer = RecordingTracer::new();
    let parent = SpanContext::new("0af7651916cd43dd8448eb211c80319c", "b7ad6b7169203331", 0x01);

    let msg = init_spans_from_parent(&tracer, &parent, "x", message_with_parts(3));

    let recorded = tracer.spans_named("x");
    assert_eq!(recorded.len(), 3);
    for span in &recorded {
        assert_eq!(span.parent.as_ref(), Some(&parent));
        assert_eq!(span.context.trace_id(), parent.trace_id());
    }
    assert_eq!(msg.len(), 3);
}

#[test]
fn test_init_spans_from_invalid_parent_falls_back_to_roots() {
    let tracer = RecordingTracer::new();

    let msg = init_spans_from_parent(
        &tracer,
        &SpanContext::invalid(),
        "x",
        message_with_parts(2),
    );

    let recorded = tracer.spans_named("x");
    assert_eq!(recorded.len(), 2);
    for span in &recorded {
        assert!(span.parent.is_none());
        assert!(span.context.is_valid());
    }
    assert!(msg.iter().all(|p| p.span().is_some()));
}

#[test]
fn test_init_spans_replaces_existing_spans_without_finishing_them() {
    let tracer = RecordingTracer::new();
    let msg = init_spans(&tracer, "first", message_with_parts(2));
    let msg = init_spans(&tracer, "second", msg);

    // The first generation was discarded, not finished: its originating
    // stage keeps ownership.
    for span in tracer.spans_named("first") {
        assert_eq!(span.finish_count, 0);
    }
    assert_eq!(tracer.spans_named("second").len(), 2);
    for part in msg.iter() {
        assert!(!part.span().expect("span attached").is_finished());
    }
}

#[test]
fn test_iterate_visits_all_parts_even_after_an_error() {
    let tracer = RecordingTracer::new();
    let msg = message_with_parts(3);

    let mut visited = Vec::new();
    let result = iterate_with_span(&tracer, "process", &msg, |i, _span, _part| {
        visited.push(i);
        if i == 1 {
            Err(format!("boom at {i}"))
        } else {
            Ok(())
        }
    });

    assert_eq!(result, Err("boom at 1".to_string()));
    assert_eq!(visited, vec![0, 1, 2]);
    // Every span opened by this call was finished despite the failure.
    let recorded = tracer.spans_named("process");
    assert_eq!(recorded.len(), 3);
    for span in &recorded {
        assert_eq!(span.finish_count, 1);
    }
}

#[test]
fn test_iterate_reports_the_first_error() {
    let tracer = RecordingTracer::new();
    let msg = message_with_parts(3);

    let result = iterate_with_span(&tracer, "process", &msg, |i, _span, _part| {
        if i >= 1 {
            Err(format!("error {i}"))
        } else {
            Ok(())
        }
    });

    assert_eq!(result, Err("error 1".to_string()));
}

#[test]
fn test_current_span_is_absent_before_attach() {
    let part = Part::new("untouched");
    assert!(part.span().is_none());
    assert!(part.carrier().is_empty());
}

#[test]
fn test_ingest_process_finish_scenario() {
    let tracer = RecordingTracer::new();

    // Ingestion: three fresh root spans named "ingest", all started.
    let msg = init_spans(&tracer, "ingest", message_with_parts(3));
    let ingest = tracer.spans_named("ingest");
    assert_eq!(ingest.len(), 3);
    for span in &ingest {
        assert!(span.parent.is_none());
        assert_eq!(span.finish_count, 0);
    }

    // Processing: three child spans named "process", one per ingest span,
    // all finished once the call returns.
    let result = iterate_with_span(&tracer, "process", &msg, |_i, _span, _part| {
        Ok::<(), ()>(())
    });
    assert!(result.is_ok());

    let process = tracer.spans_named("process");
    assert_eq!(process.len(), 3);
    for (i, span) in process.iter().enumerate() {
        let parent = msg
            .get(i)
            .and_then(|p| p.span())
            .expect("ingest span attached")
            .context();
        assert_eq!(span.parent.as_ref(), Some(parent));
        assert_eq!(span.finish_count, 1);
    }
    // The ingest spans are untouched by the iteration.
    for span in tracer.spans_named("ingest") {
        assert_eq!(span.finish_count, 0);
    }

    // Egress on the original message: each ingest span finishes exactly once.
    finish_spans(&msg);
    for span in tracer.spans_named("ingest") {
        assert_eq!(span.finish_count, 1);
    }
}

#[test]
fn test_iterate_with_noop_tracer_is_total() {
    let msg = message_with_parts(2);
    let mut calls = 0;
    let result = iterate_with_span(&NoopTracer, "process", &msg, |_i, span, _part| {
        calls += 1;
        assert!(!span.context().is_valid());
        Ok::<(), ()>(())
    });
    assert!(result.is_ok());
    assert_eq!(calls, 2);
}

#[test]
fn test_iterate_starts_roots_for_bare_parts() {
    let tracer = RecordingTracer::new();
    let msg = message_with_parts(2);

    let result = iterate_with_span(&tracer, "process", &msg, |_i, _span, _part| {
        Ok::<(), ()>(())
    });
    assert!(result.is_ok());

    for span in tracer.spans_named("process") {
        assert!(span.parent.is_none());
    }
}

#[test]
fn test_empty_message_is_a_no_op() {
    let tracer = RecordingTracer::new();
    let msg = init_spans(&tracer, "x", Message::default());
    assert!(msg.is_empty());

    let result = iterate_with_span(&tracer, "process", &msg, |_i, _span, _part| {
        Err("never called".to_string())
    });
    assert!(result.is_ok());

    finish_spans(&msg);
    assert_eq!(tracer.started_count(), 0);
}
