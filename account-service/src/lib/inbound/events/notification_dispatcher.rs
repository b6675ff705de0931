use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::events::EventHandler;
use crate::domain::events::EventHandlerError;
use crate::domain::events::Topic;
use crate::domain::notification::ports::MailSender;
use crate::domain::notification::templates::reset_password_html;
use crate::domain::notification::templates::RESET_PASSWORD_SUBJECT;
use crate::domain::user::events::ResetPasswordEvent;
use crate::domain::user::events::ResetPasswordMessage;

/// Turns reset-requested events into emails.
///
/// Failures are returned to the consumer rather than retried here.
pub struct NotificationDispatcher<M: MailSender> {
    mailer: Arc<M>,
    from_address: String,
    reset_link_base: String,
}

impl<M: MailSender> NotificationDispatcher<M> {
    /// # Arguments
    /// * `mailer` - Outbound mail transport
    /// * `from_address` - Sender of every notification
    /// * `reset_link_base` - Page the reset link points to
    pub fn new(mailer: Arc<M>, from_address: String, reset_link_base: String) -> Self {
        Self {
            mailer,
            from_address,
            reset_link_base,
        }
    }

    async fn send_reset_password(&self, payload: &[u8]) -> Result<(), EventHandlerError> {
        let event: ResetPasswordEvent = serde_json::from_slice::<ResetPasswordMessage>(payload)
            .map_err(|e| EventHandlerError::Decode(e.to_string()))?
            .into();

        let body = reset_password_html(&self.reset_link_base, &event.token, event.expires_at);

        self.mailer
            .send(
                &self.from_address,
                &[event.email.clone()],
                RESET_PASSWORD_SUBJECT,
                &body,
            )
            .await
            .map_err(|e| EventHandlerError::Delivery(e.to_string()))?;

        tracing::info!(email = %event.email, "Reset password email sent");
        Ok(())
    }
}

#[async_trait]
impl<M: MailSender> EventHandler for NotificationDispatcher<M> {
    async fn handle(
        &self,
        topic: &str,
        _key: Option<&[u8]>,
        payload: &[u8],
    ) -> Result<(), EventHandlerError> {
        match Topic::from_name(topic) {
            Some(Topic::ResetPassword) => self.send_reset_password(payload).await,
            None => Err(EventHandlerError::UnknownTopic(topic.to_string())),
        }
    }
}
