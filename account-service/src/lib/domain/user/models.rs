use std::fmt;
use std::str::FromStr;

use auth::IssuedToken;
use auth::RESET_TOKEN_TTL_SECS;
use chrono::DateTime;
use chrono::Utc;
use uuid::Uuid;

use crate::user::errors::UserIdError;
use crate::user::errors::UserValidationError;

/// Lifetime of a stored reset ticket, aligned with the reset token itself.
pub const RESET_TICKET_TTL_SECS: u64 = RESET_TOKEN_TTL_SECS as u64;

/// User aggregate entity.
///
/// Only ever persisted through [`ValidatedUser`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User unique identifier type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserId(pub Uuid);

impl UserId {
    /// Generate a new random user ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a user ID from string.
    ///
    /// # Errors
    /// * `InvalidFormat` - String is not a valid UUID
    pub fn from_string(s: &str) -> Result<Self, UserIdError> {
        Uuid::parse_str(s)
            .map(UserId)
            .map_err(|e| UserIdError::InvalidFormat(e.to_string()))
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A user whose fields satisfy the persistence invariants.
///
/// The inner value is private: the only way to obtain one is [`ValidatedUser::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedUser(User);

impl ValidatedUser {
    /// Validate a user before it crosses the persistence boundary.
    ///
    /// # Arguments
    /// * `user` - Candidate user
    ///
    /// # Returns
    /// Validated wrapper around the same user
    ///
    /// # Errors
    /// * `EmptyName` - Name is blank
    /// * `InvalidEmail` - Email is missing or not RFC 5322
    /// * `EmptyPassword` - No password hash is present
    pub fn new(user: User) -> Result<Self, UserValidationError> {
        if user.name.trim().is_empty() {
            return Err(UserValidationError::EmptyName);
        }

        email_address::EmailAddress::from_str(&user.email)
            .map_err(|e| UserValidationError::InvalidEmail(e.to_string()))?;

        if user.password_hash.is_empty() {
            return Err(UserValidationError::EmptyPassword);
        }

        Ok(Self(user))
    }

    pub fn user(&self) -> &User {
        &self.0
    }

    pub fn into_inner(self) -> User {
        self.0
    }
}

/// Reject an empty plaintext password before it is hashed.
pub fn validate_password(password: &str) -> Result<(), UserValidationError> {
    if password.is_empty() {
        Err(UserValidationError::EmptyPassword)
    } else {
        Ok(())
    }
}

/// Ephemeral store key of the reset ticket for a user.
pub fn reset_ticket_key(user_id: &UserId) -> String {
    format!("user:{}:reset-password", user_id)
}

/// Command to register a new account.
#[derive(Debug, Clone)]
pub struct RegisterCommand {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Command to log in with email and password.
#[derive(Debug, Clone)]
pub struct LoginCommand {
    pub email: String,
    pub password: String,
}

/// Command to update the profile of an existing user.
///
/// Absent name or email keeps the stored value. A password change requires
/// both the current and the new password.
#[derive(Debug, Clone)]
pub struct UpdateProfileCommand {
    pub name: Option<String>,
    pub email: Option<String>,
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

/// Command to redeem a password reset token.
#[derive(Debug, Clone)]
pub struct ResetPasswordCommand {
    pub token: String,
    pub new_password: String,
}

/// Command to delete the account of the authenticated user.
#[derive(Debug, Clone)]
pub struct DeleteProfileCommand {
    pub password: String,
}

/// Result of a successful register or login.
#[derive(Debug, Clone)]
pub struct AuthenticatedSession {
    pub user: User,
    pub access_token: IssuedToken,
    pub refresh_token: IssuedToken,
}
