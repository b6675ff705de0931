use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

/// Event bus topics this service produces or consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    ResetPassword,
}

impl Topic {
    /// Every topic the notification consumer subscribes to.
    pub const ALL: [Topic; 1] = [Topic::ResetPassword];

    /// Wire name of the topic.
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::ResetPassword => "reset-password",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|topic| topic.as_str() == name)
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by an event handler; the message stays uncommitted.
#[derive(Debug, Error)]
pub enum EventHandlerError {
    #[error("No handler for topic: {0}")]
    UnknownTopic(String),

    #[error("Failed to decode payload: {0}")]
    Decode(String),

    #[error("Failed to deliver notification: {0}")]
    Delivery(String),
}

/// Callback invoked by the event consumer for each received message.
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    /// Handle one message.
    ///
    /// # Arguments
    /// * `topic` - Topic the message was read from
    /// * `key` - Partitioning key, if any
    /// * `payload` - Raw message body
    ///
    /// # Errors
    /// Any error leaves the message unacknowledged
    async fn handle(
        &self,
        topic: &str,
        key: Option<&[u8]>,
        payload: &[u8],
    ) -> Result<(), EventHandlerError>;
}
