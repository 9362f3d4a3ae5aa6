//! Spanline
//!
//! Per-part distributed tracing span propagation for batch message pipelines.
//!
//! A pipeline unit is a [`Message`]: an ordered batch of immutable [`Part`]
//! values flowing through inputs, processors and outputs. Each part carries
//! its own span so that when a batch is split, merged or processed by
//! diverging logic, every resulting part keeps a correct causal lineage and
//! no span is leaked.
//!
//! # Example
//!
//! ```no_run
//! use spanline::config::JaegerConfig;
//! use spanline::message::{Message, Part};
//! use spanline::tracing::jaeger::{Jaeger, OtelTracer};
//! use spanline::tracing::{finish_spans, init_spans, iterate_with_span};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let _jaeger = Jaeger::install(&JaegerConfig::default())?;
//! let tracer = OtelTracer::new();
//!
//! let msg: Message = vec![Part::new("hello"), Part::new("world")]
//!     .into_iter()
//!     .collect();
//! let msg = init_spans(&tracer, "ingest", msg);
//!
//! iterate_with_span(&tracer, "process", &msg, |_i, _span, _part| {
//!     Ok::<(), std::io::Error>(())
//! })?;
//!
//! finish_spans(&msg);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod message;
pub mod output;
pub mod tracing;

// Re-export commonly used types
pub use config::Config;
pub use message::{Message, Part};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
