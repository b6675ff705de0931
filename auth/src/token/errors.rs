use thiserror::Error;

/// Error type for token issuing and verification.
///
/// Verification failures are split by kind so callers can tell a forged
/// token from a stale or incomplete one.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("Failed to sign token: {0}")]
    SigningFailed(String),

    #[error("Token is malformed: {0}")]
    Malformed(String),

    #[error("Token is expired")]
    Expired,

    #[error("Token signature does not match")]
    SignatureMismatch,

    #[error("Missing required claim: {0}")]
    MissingField(&'static str),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::InvalidSignature => TokenError::SignatureMismatch,
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Malformed(err.to_string()),
        }
    }
}

/// Error type for signing secret configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SecretsError {
    #[error("Signing secret for {0} tokens is empty")]
    Empty(&'static str),

    #[error("Signing secrets for {0} and {1} tokens must differ")]
    Shared(&'static str, &'static str),
}
