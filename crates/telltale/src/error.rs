//! Error types for the tracking layer.
//!
//! The tracking layer introduces exactly two failure modes of its own:
//! refusing to wrap a frozen value, and refusing to answer change-set
//! queries for values it has never seen. Schema validation failures come
//! from the external collaborator and pass through unchanged. Every other
//! operation succeeds whenever it would succeed on the unwrapped value.

use thiserror::Error;

/// Errors returned by tracker construction and handle operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The value (or a nested value) is frozen and cannot accept tracking
    /// metadata; nothing was wrapped.
    #[error("frozen value cannot accept tracking metadata")]
    Frozen,
    /// The value was never registered as a root or valid node.
    #[error("value is not tracked")]
    NotTracked,
    /// Tracking requires a structured value (record, list or container).
    #[error("tracking requires a structured value")]
    NotStructured,
    /// The operation does not apply to this value kind (e.g. field access
    /// on a container).
    #[error("operation does not apply to this value kind")]
    WrongKind,
    /// List fields are addressed by numeric index.
    #[error("list fields are addressed by numeric index")]
    IndexExpected,
    /// `dirty_top_level_slice` is only available on schema-backed trackers.
    #[error("dirty slice requires a schema-backed tracker")]
    NotSchemaBacked,
    /// A validation failure from the schema collaborator, forwarded as-is.
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// A validation failure reported by the schema collaborator.
///
/// The tracking core never constructs or interprets these; it only carries
/// them from the collaborator to the tracker constructor's caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("schema validation failed at `{path}`: {message}")]
pub struct SchemaError {
    pub path: String,
    pub message: String,
}

impl SchemaError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}
