use std::error::Error;
use std::sync::Arc;

/// Errors raised by the reference cache.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CacheError {
    /// The loader recorded a failure. Every parked caller receives the
    /// same shared error.
    #[error("load failed: {0}")]
    LoadFailed(Arc<dyn Error + Send + Sync>),

    /// A thread other than the designated loader tried to complete the
    /// entry.
    #[error("only the loading thread may complete the entry for `{key}`")]
    NotOwner { key: String },

    /// The entry was already completed.
    #[error("the entry for `{key}` is already complete")]
    AlreadyDone { key: String },

    /// The loader itself tried to wait for its own load.
    #[error("the loading thread cannot wait for its own load of `{key}`")]
    WouldDeadlock { key: String },

    /// The loaded dataset was dropped before this caller could take it;
    /// request the key again to reload it.
    #[error("the dataset for `{key}` was dropped before it could be handed over")]
    Collected { key: String },
}

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
