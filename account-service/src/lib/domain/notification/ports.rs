use async_trait::async_trait;

use crate::domain::notification::errors::MailError;

/// Outbound mail transport.
#[async_trait]
pub trait MailSender: Send + Sync + 'static {
    /// Send an HTML message.
    ///
    /// # Arguments
    /// * `from` - Sender address
    /// * `to` - Recipient addresses
    /// * `subject` - Subject line
    /// * `html_body` - HTML body
    ///
    /// # Errors
    /// * `InvalidAddress` - A sender or recipient cannot be parsed
    /// * `Build` - Message could not be assembled
    /// * `Transport` - Delivery to the relay failed
    async fn send(
        &self,
        from: &str,
        to: &[String],
        subject: &str,
        html_body: &str,
    ) -> Result<(), MailError>;
}
