//! Message and part values flowing through a pipeline
//!
//! A [`Message`] is an ordered batch of [`Part`] values. Parts are immutable:
//! every modifier returns a new value, and a message is updated by bulk
//! replacement of its parts. Reshaping a batch therefore never corrupts
//! another holder's view of a part, and each part's span carrier travels with
//! it through splits and merges.

use std::collections::HashMap;

use bytes::Bytes;

use crate::tracing::span::{Span, SpanCarrier};

/// One unit of payload plus metadata within a message.
///
/// A part holds a non-owning span reference via its [`SpanCarrier`]; stages
/// other than the tracing layer only ever ask "does this part have a span"
/// and "give me a handle to start a child of it".
#[derive(Debug, Clone, Default)]
pub struct Part {
    data: Bytes,
    metadata: HashMap<String, String>,
    carrier: SpanCarrier,
}

impl Part {
    /// Create a part from a payload, with empty metadata and no span.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            metadata: HashMap::new(),
            carrier: SpanCarrier::empty(),
        }
    }

    /// The part payload.
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// String-keyed metadata attached to this part.
    pub fn metadata(&self) -> &HashMap<String, String> {
        &self.metadata
    }

    /// Look up a single metadata value.
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// Return a new part with the payload replaced.
    pub fn with_data(mut self, data: impl Into<Bytes>) -> Self {
        self.data = data.into();
        self
    }

    /// Return a new part with the metadata map replaced.
    pub fn with_metadata(mut self, metadata: HashMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Return a new part with one metadata entry added or replaced.
    pub fn with_metadata_value(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Return a new part carrying `span`, replacing any previous carrier
    /// state. The input part is unaffected.
    pub fn with_span(mut self, span: Span) -> Self {
        self.carrier = SpanCarrier::with_span(span);
        self
    }

    /// The part's span carrier.
    pub fn carrier(&self) -> &SpanCarrier {
        &self.carrier
    }

    /// The currently attached span, or `None` if no span was ever attached.
    /// Absence is a first-class outcome, not an error.
    pub fn span(&self) -> Option<&Span> {
        self.carrier.span()
    }
}

/// An ordered, index-addressable sequence of parts.
#[derive(Debug, Clone, Default)]
pub struct Message {
    parts: Vec<Part>,
}

impl Message {
    /// Create a message from a sequence of parts.
    pub fn new(parts: Vec<Part>) -> Self {
        Self { parts }
    }

    /// Number of parts in the message.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Whether the message contains no parts.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// The part at `index`, if present.
    pub fn get(&self, index: usize) -> Option<&Part> {
        self.parts.get(index)
    }

    /// Iterate the parts in index order.
    pub fn iter(&self) -> std::slice::Iter<'_, Part> {
        self.parts.iter()
    }

    /// The parts as a slice.
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// Consume the message, yielding its parts.
    pub fn into_parts(self) -> Vec<Part> {
        self.parts
    }

    /// Bulk-replace every part of the message.
    pub fn set_parts(&mut self, parts: Vec<Part>) {
        self.parts = parts;
    }

    /// Append a part to the message.
    pub fn push(&mut self, part: Part) {
        self.parts.push(part);
    }
}

impl FromIterator<Part> for Message {
    fn from_iter<T: IntoIterator<Item = Part>>(iter: T) -> Self {
        Self {
            parts: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Message {
    type Item = &'a Part;
    type IntoIter = std::slice::Iter<'a, Part>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
