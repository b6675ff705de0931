use thiserror::Error;

/// Error for ephemeral key-value store operations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    /// Key is absent or its TTL has elapsed
    #[error("Key not found: {0}")]
    NotFound(String),

    #[error("Operation against a key holding the wrong kind of value: {0}")]
    WrongType(String),

    #[error("Store transport failure: {0}")]
    Transport(String),
}
