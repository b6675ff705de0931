use super::errors::SecretsError;

/// Independent signing material for each token purpose.
///
/// A leaked reset secret must not allow forging access or refresh tokens,
/// so construction rejects empty and shared secrets.
#[derive(Clone)]
pub struct TokenSecrets {
    pub(crate) access: Vec<u8>,
    pub(crate) refresh: Vec<u8>,
    pub(crate) reset: Vec<u8>,
}

impl TokenSecrets {
    /// Build the secret set.
    ///
    /// # Arguments
    /// * `access` - Secret for access tokens
    /// * `refresh` - Secret for refresh tokens
    /// * `reset` - Secret for password reset tokens
    ///
    /// # Errors
    /// * `Empty` - One of the secrets is empty
    /// * `Shared` - Two purposes were given the same secret
    pub fn new(
        access: impl Into<Vec<u8>>,
        refresh: impl Into<Vec<u8>>,
        reset: impl Into<Vec<u8>>,
    ) -> Result<Self, SecretsError> {
        let secrets = Self {
            access: access.into(),
            refresh: refresh.into(),
            reset: reset.into(),
        };

        let named = [
            ("access", &secrets.access),
            ("refresh", &secrets.refresh),
            ("reset", &secrets.reset),
        ];

        for (name, secret) in named {
            if secret.is_empty() {
                return Err(SecretsError::Empty(name));
            }
        }

        for (i, (first, a)) in named.iter().enumerate() {
            for (second, b) in &named[i + 1..] {
                if a == b {
                    return Err(SecretsError::Shared(*first, *second));
                }
            }
        }

        Ok(secrets)
    }
}

impl std::fmt::Debug for TokenSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSecrets")
            .field("access", &"<redacted>")
            .field("refresh", &"<redacted>")
            .field("reset", &"<redacted>")
            .finish()
    }
}
