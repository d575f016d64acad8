//! Error types for blockcrs.

use thiserror::Error;

/// Errors that can occur while building or using a block sparse matrix.
///
/// Structural misses (a requested column that is not stored in a row) and
/// invalid local rows are *not* errors: they are reported through returned
/// counts and `None`. The variants below are contract violations.
#[derive(Debug, Error)]
pub enum BlockCrsError {
    /// A vector's block size differs from the matrix's.
    #[error("invalid block size {block_size}")]
    InvalidBlockSize { block_size: usize },

    /// Column padding smaller than the block size.
    #[error("column padding {padding} is smaller than block size {block_size}")]
    InvalidColumnPadding { padding: usize, block_size: usize },

    /// The graph has not been fill-completed.
    #[error("graph is not fill-complete")]
    GraphNotFillComplete,

    /// Row offsets or column indices are inconsistent.
    #[error("malformed graph: {reason}")]
    MalformedGraph { reason: String },

    /// A map was given the same global index twice.
    #[error("global index {gid} appears more than once in map")]
    DuplicateGlobalIndex { gid: usize },

    /// Index out of bounds.
    #[error("index out of bounds: index {index} is out of range for length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    /// Data length does not match the expected size.
    #[error("shape mismatch: expected {expected} elements, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// Expanding a mesh index into point indices overflows `usize`.
    #[error("global index {gid} with block size {block_size} has no representable point indices")]
    GlobalIndexOverflow { gid: usize, block_size: usize },

    /// Two maps that must be compatible are not.
    #[error("map mismatch: {context}")]
    MapMismatch { context: String },

    /// A global index needed by a transfer is not owned by the source.
    #[error("global index {gid} is not present in the {side} map")]
    MissingGlobalIndex { gid: usize, side: &'static str },

    /// Input and output multivectors have different numbers of vectors.
    #[error("vector count mismatch: X has {x} vectors, Y has {y}")]
    VectorCountMismatch { x: usize, y: usize },

    /// The operation exists in the interface but has no implementation.
    #[error("{operation} is not implemented")]
    NotImplemented { operation: &'static str },

    /// The object cannot take part in generic data migration.
    #[error("{object} does not support distributed migration")]
    MigrationUnsupported { object: &'static str },
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BlockCrsError>;

/// Log and build a [`BlockCrsError::NotImplemented`].
pub(crate) fn not_implemented(operation: &'static str) -> BlockCrsError {
    log::error!("{operation} was requested but is not implemented");
    BlockCrsError::NotImplemented { operation }
}
