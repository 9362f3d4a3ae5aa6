//! Interpolated strings for destination keys
//!
//! Supports `${!function}` and `${!function:argument}` placeholders resolved
//! per part at render time:
//!
//! | Function | Result |
//! |----------|--------|
//! | `count:name` | shared named counter, starting at 1 |
//! | `timestamp_unix` | seconds since the epoch |
//! | `timestamp_unix_nano` | nanoseconds since the epoch |
//! | `metadata:key` | the part's metadata value for `key`, or empty |
//! | `uuid_v4` | a random UUID |
//!
//! Unrecognized placeholders are kept verbatim.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;
use lazy_static::lazy_static;
use regex_lite::Regex;
use uuid::Uuid;

use crate::message::Message;

lazy_static! {
    static ref FUNCTION_RE: Regex =
        Regex::new(r"\$\{!([a-z0-9_]+)(?::([^}]+))?\}").expect("static regex");
    // Counters are shared across all interpolated strings in the process so
    // that concurrent writers never produce colliding keys.
    static ref COUNTERS: Mutex<HashMap<String, u64>> = Mutex::new(HashMap::new());
}

fn next_count(name: &str) -> u64 {
    let mut counters = COUNTERS.lock().expect("counter lock poisoned");
    let counter = counters.entry(name.to_string()).or_insert(0);
    *counter += 1;
    *counter
}

#[derive(Debug, Clone)]
enum Segment {
    Literal(String),
    Count(String),
    TimestampUnix,
    TimestampUnixNano,
    Metadata(String),
    UuidV4,
}

/// A string with `${!function}` placeholders, parsed once and rendered per
/// part.
#[derive(Debug, Clone)]
pub struct InterpolatedString {
    segments: Vec<Segment>,
}

impl InterpolatedString {
    /// Parse a raw template. Parsing never fails; unknown functions stay as
    /// literal text.
    pub fn parse(raw: &str) -> Self {
        let mut segments = Vec::new();
        let mut last_match = 0;

        for cap in FUNCTION_RE.captures_iter(raw) {
            let full_match = cap.get(0).expect("capture 0 always present");
            if full_match.start() > last_match {
                segments.push(Segment::Literal(raw[last_match..full_match.start()].to_string()));
            }

            let name = cap.get(1).expect("function name group").as_str();
            let arg = cap.get(2).map(|m| m.as_str());
            let segment = match (name, arg) {
                ("count", Some(counter)) => Segment::Count(counter.to_string()),
                ("timestamp_unix", None) => Segment::TimestampUnix,
                ("timestamp_unix_nano", None) => Segment::TimestampUnixNano,
                ("metadata", Some(key)) => Segment::Metadata(key.to_string()),
                ("uuid_v4", None) => Segment::UuidV4,
                _ => Segment::Literal(full_match.as_str().to_string()),
            };
            segments.push(segment);

            last_match = full_match.end();
        }
        if last_match < raw.len() {
            segments.push(Segment::Literal(raw[last_match..].to_string()));
        }

        Self { segments }
    }

    /// Whether the template contains no placeholders.
    pub fn is_static(&self) -> bool {
        self.segments
            .iter()
            .all(|segment| matches!(segment, Segment::Literal(_)))
    }

    /// Render the template against the part at `index` of `msg`.
    pub fn render(&self, msg: &Message, index: usize) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Count(name) => out.push_str(&next_count(name).to_string()),
                Segment::TimestampUnix => out.push_str(&Utc::now().timestamp().to_string()),
                Segment::TimestampUnixNano => out.push_str(
                    &Utc::now()
                        .timestamp_nanos_opt()
                        .unwrap_or_default()
                        .to_string(),
                ),
                Segment::Metadata(key) => {
                    let value = msg
                        .get(index)
                        .and_then(|part| part.metadata_value(key))
                        .unwrap_or_default();
                    out.push_str(value);
                }
                Segment::UuidV4 => out.push_str(&Uuid::new_v4().to_string()),
            }
        }
        out
    }
}
