//! Pipeline outputs
//!
//! Terminal consumers of messages. The object-storage writer uploads each
//! part of a message as one object, with its destination key interpolated
//! from per-part context.

pub mod interpolation;
pub mod object_storage;

pub use interpolation::InterpolatedString;
pub use object_storage::{ObjectStorage, OutputError};
