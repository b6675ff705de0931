use async_trait::async_trait;

use crate::domain::user::events::ResetPasswordEvent;
use crate::domain::user::models::AuthenticatedSession;
use crate::domain::user::models::DeleteProfileCommand;
use crate::domain::user::models::LoginCommand;
use crate::domain::user::models::RegisterCommand;
use crate::domain::user::models::ResetPasswordCommand;
use crate::domain::user::models::UpdateProfileCommand;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::domain::user::models::ValidatedUser;
use crate::user::errors::AuthError;
use crate::user::errors::EventPublisherError;

/// Port for authentication and account operations.
#[async_trait]
pub trait AuthenticateServicePort: Send + Sync + 'static {
    /// Create an account and open a session for it.
    ///
    /// # Errors
    /// * `Validation` - Name, email or password is empty or malformed
    /// * `EmailAlreadyExists` - Email is already registered
    /// * `DatabaseError` - Database operation failed
    async fn register(&self, command: RegisterCommand) -> Result<AuthenticatedSession, AuthError>;

    /// Check credentials and open a session.
    ///
    /// # Errors
    /// * `UserNotFound` - No account for this email
    /// * `InvalidCredentials` - Password does not match
    async fn login(&self, command: LoginCommand) -> Result<AuthenticatedSession, AuthError>;

    /// Mint a new access token from a refresh token.
    ///
    /// # Errors
    /// * `InvalidToken` - Refresh token failed verification
    /// * `UserNotFound` - Subject no longer exists
    async fn refresh_access_token(&self, refresh_token: &str) -> Result<auth::IssuedToken, AuthError>;

    /// Resolve the user behind an access token.
    ///
    /// # Errors
    /// * `InvalidToken` - Access token failed verification
    /// * `UserNotFound` - Subject no longer exists
    async fn authenticate_access_token(&self, access_token: &str) -> Result<User, AuthError>;

    /// # Errors
    /// * `UserNotFound` - User does not exist
    async fn profile(&self, user_id: &UserId) -> Result<User, AuthError>;

    /// Update name, email and optionally the password.
    ///
    /// # Errors
    /// * `UserNotFound` - User does not exist
    /// * `InvalidCredentials` - Supplied current password does not match
    /// * `Validation` - Resulting user is invalid or the new password is missing
    /// * `EmailAlreadyExists` - New email is already registered
    async fn update_profile(
        &self,
        user_id: &UserId,
        command: UpdateProfileCommand,
    ) -> Result<User, AuthError>;

    /// Phase one of the reset protocol: issue, store and publish a reset token.
    ///
    /// # Errors
    /// * `UserNotFound` - No account for this email
    /// * `Cache` - Ticket could not be stored
    /// * `EventBus` - Event could not be published (the ticket stays stored)
    async fn request_password_reset(&self, email: &str) -> Result<(), AuthError>;

    /// Phase two of the reset protocol: redeem a reset token exactly once.
    ///
    /// # Errors
    /// * `InvalidToken` - Token failed verification or is not the live ticket
    /// * `UserNotFound` - Account behind the token no longer exists
    /// * `TokenConsumedOrExpired` - No live ticket for this user
    /// * `Validation` - New password is empty
    async fn reset_password_with_token(&self, command: ResetPasswordCommand)
        -> Result<(), AuthError>;

    /// Delete an account after re-checking its password.
    ///
    /// # Errors
    /// * `UserNotFound` - User does not exist
    /// * `InvalidCredentials` - Password does not match
    async fn delete_profile(
        &self,
        user_id: &UserId,
        command: DeleteProfileCommand,
    ) -> Result<(), AuthError>;
}

/// Persistence operations for user aggregate.
#[async_trait]
pub trait UserRepository: Send + Sync + 'static {
    /// Persist new user to storage.
    ///
    /// # Errors
    /// * `EmailAlreadyExists` - Email is already registered
    /// * `DatabaseError` - Database operation failed
    async fn create(&self, user: ValidatedUser) -> Result<User, AuthError>;

    /// Retrieve user by identifier.
    ///
    /// # Returns
    /// Optional user entity (None if not found)
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, AuthError>;

    /// Retrieve user by email address.
    ///
    /// # Returns
    /// Optional user entity (None if not found)
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError>;

    /// Update existing user in storage.
    ///
    /// # Errors
    /// * `UserNotFound` - User does not exist
    /// * `EmailAlreadyExists` - New email is already registered
    /// * `DatabaseError` - Database operation failed
    async fn update(&self, user: ValidatedUser) -> Result<User, AuthError>;

    /// Remove user from storage.
    ///
    /// # Errors
    /// * `UserNotFound` - User does not exist
    /// * `DatabaseError` - Database operation failed
    async fn delete(&self, id: &UserId) -> Result<(), AuthError>;
}

/// Event publishing for domain events.
#[async_trait]
pub trait EventPublisher: Send + Sync + 'static {
    /// Publish a reset request, keyed by the user's email.
    ///
    /// # Errors
    /// * `SerializationFailed` - Event serialization failed
    /// * `PublishFailed` - Failed to publish to broker
    async fn publish_password_reset(
        &self,
        event: &ResetPasswordEvent,
    ) -> Result<(), EventPublisherError>;
}
