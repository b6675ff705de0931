use thiserror::Error;

/// Error for outbound mail delivery
#[derive(Debug, Clone, Error)]
pub enum MailError {
    #[error("Invalid mail address: {0}")]
    InvalidAddress(String),

    #[error("Failed to build message: {0}")]
    Build(String),

    #[error("Mail transport failure: {0}")]
    Transport(String),
}
