use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use crate::domain::user::models::User;

/// Domain event published when a user asks for a password reset.
///
/// Carries the reset token out of band to the notification pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetPasswordEvent {
    pub email: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl ResetPasswordEvent {
    /// Create the event for a freshly issued reset token.
    ///
    /// # Arguments
    /// * `user` - Account being reset
    /// * `token` - Signed reset token
    /// * `expires_at` - Expiry of the token
    pub fn new(user: &User, token: String, expires_at: DateTime<Utc>) -> Self {
        Self {
            email: user.email.clone(),
            token,
            expires_at,
        }
    }
}

/// Wire representation of [`ResetPasswordEvent`] on the `reset-password` topic.
///
/// Shared by the producer and the notification consumer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResetPasswordMessage {
    pub email: String,
    pub token: String,
    pub exp: DateTime<Utc>,
}

impl From<&ResetPasswordEvent> for ResetPasswordMessage {
    fn from(event: &ResetPasswordEvent) -> Self {
        Self {
            email: event.email.clone(),
            token: event.token.clone(),
            exp: event.expires_at,
        }
    }
}

impl From<ResetPasswordMessage> for ResetPasswordEvent {
    fn from(message: ResetPasswordMessage) -> Self {
        Self {
            email: message.email,
            token: message.token,
            expires_at: message.exp,
        }
    }
}
