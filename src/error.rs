use crate::types::{Position, Width};

/// All errors that can occur in sdrbank operations.
#[derive(Debug, thiserror::Error)]
pub enum SdrError {
    /// Trait position is outside the bank's fixed trait universe.
    #[error("invalid trait: position {position} >= width {width}")]
    InvalidTrait { position: Position, width: Width },

    /// Storage id does not name a stored concept.
    #[error("invalid concept id: {id} >= storage size {storage_size}")]
    InvalidConceptId { id: Position, storage_size: usize },

    /// Width disagreement between the bank and a weight array or a loaded file.
    #[error("width mismatch: expected {expected}, got {got}")]
    WidthMismatch { expected: Width, got: Width },

    /// File I/O error during persistence.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Binary format error (bad magic, bad version, truncated, invalid structure).
    #[error("codec error: {0}")]
    Codec(String),
}

/// Convenience alias for sdrbank results.
pub type Result<T> = std::result::Result<T, SdrError>;
