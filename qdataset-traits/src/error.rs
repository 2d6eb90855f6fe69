/// Errors raised by dataset accessors and view constructors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DataSetError {
    /// An accessor or operator was used with the wrong rank.
    #[error("rank mismatch on {context}: expected {expected}, found {actual}")]
    RankMismatch {
        expected: String,
        actual: usize,
        context: String,
    },

    /// An index lies outside `[0, length)` of its dimension.
    #[error("index {index} out of bounds for dimension {dim} of length {length} in {context}")]
    IndexOutOfBounds {
        index: i64,
        dim: usize,
        length: usize,
        context: String,
    },

    /// An operator precondition does not hold.
    #[error("invalid construction: {0}")]
    InvalidConstruction(String),

    /// A write was attempted on a sealed dataset.
    #[error("dataset is immutable: {0}")]
    Immutable(String),
}

impl DataSetError {
    pub fn rank(expected: impl ToString, actual: usize, context: impl Into<String>) -> Self {
        DataSetError::RankMismatch {
            expected: expected.to_string(),
            actual,
            context: context.into(),
        }
    }

    pub fn bounds(index: i64, dim: usize, length: usize, context: impl Into<String>) -> Self {
        DataSetError::IndexOutOfBounds {
            index,
            dim,
            length,
            context: context.into(),
        }
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        DataSetError::InvalidConstruction(msg.into())
    }
}

/// Result type for dataset operations.
pub type Result<T> = std::result::Result<T, DataSetError>;
