use thiserror::Error;

use crate::domain::cache::errors::CacheError;

/// Error for UserId parsing failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UserIdError {
    #[error("Invalid UUID format: {0}")]
    InvalidFormat(String),
}

/// Field invariants a user must satisfy before persistence
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UserValidationError {
    #[error("Name must not be empty")]
    EmptyName,

    #[error("Invalid email format: {0}")]
    InvalidEmail(String),

    #[error("Password must not be empty")]
    EmptyPassword,
}

/// Error for event publishing operations
#[derive(Debug, Clone, Error)]
pub enum EventPublisherError {
    #[error("Failed to serialize event: {0}")]
    SerializationFailed(String),

    #[error("Failed to publish event to broker: {0}")]
    PublishFailed(String),
}

/// Top-level error for all authentication and account operations
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("Validation failed: {0}")]
    Validation(#[from] UserValidationError),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Email already exists: {0}")]
    EmailAlreadyExists(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Bad signature, expired, malformed, or no longer the live reset ticket.
    /// The reason is kept for logs only.
    #[error("Invalid token")]
    InvalidToken(String),

    #[error("Reset token has already been used or has expired")]
    TokenConsumedOrExpired,

    #[error("Failed to sign token: {0}")]
    Signing(String),

    #[error("Password hashing failed: {0}")]
    Password(String),

    // Transport failures
    #[error("Ephemeral store error: {0}")]
    Cache(#[from] CacheError),

    #[error("Event bus error: {0}")]
    EventBus(#[from] EventPublisherError),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
