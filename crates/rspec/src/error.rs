//! Error types for request document generation.

/// Errors raised while producing a request document.
#[derive(Debug, thiserror::Error)]
pub enum RspecError {
    /// The graph could not be serialized
    #[error("failed to serialize request document: {0}")]
    Serialize(String),
    /// The graph has no control node
    #[error("topology has no nodes")]
    EmptyTopology,
}

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, RspecError>;
