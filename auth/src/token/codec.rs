use std::sync::Arc;

use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use jsonwebtoken::decode;
use jsonwebtoken::encode;
use jsonwebtoken::Algorithm;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::EncodingKey;
use jsonwebtoken::Header;
use jsonwebtoken::Validation;
use serde::Serialize;
use uuid::Uuid;

use super::claims::AccessClaims;
use super::claims::IssuedToken;
use super::claims::RawClaims;
use super::claims::RefreshClaims;
use super::claims::ResetClaims;
use super::claims::ACCESS_TOKEN_TTL_SECS;
use super::claims::REFRESH_TOKEN_TTL_SECS;
use super::claims::RESET_TOKEN_TTL_SECS;
use super::clock::Clock;
use super::clock::SystemClock;
use super::errors::TokenError;
use super::secrets::TokenSecrets;

struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SigningKeys {
    fn from_secret(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

/// Issues and verifies access, refresh and reset tokens.
///
/// All three kinds are HS256 JWTs; each kind is signed with its own secret,
/// so a token of one kind never verifies as another.
pub struct TokenCodec {
    access: SigningKeys,
    refresh: SigningKeys,
    reset: SigningKeys,
    algorithm: Algorithm,
    clock: Arc<dyn Clock>,
}

impl TokenCodec {
    /// Create a codec backed by the wall clock.
    ///
    /// # Arguments
    /// * `secrets` - Per-purpose signing secrets
    pub fn new(secrets: &TokenSecrets) -> Self {
        Self::with_clock(secrets, Arc::new(SystemClock))
    }

    /// Create a codec with an explicit time source.
    ///
    /// # Arguments
    /// * `secrets` - Per-purpose signing secrets
    /// * `clock` - Source of "now" for both issuing and verification
    pub fn with_clock(secrets: &TokenSecrets, clock: Arc<dyn Clock>) -> Self {
        Self {
            access: SigningKeys::from_secret(&secrets.access),
            refresh: SigningKeys::from_secret(&secrets.refresh),
            reset: SigningKeys::from_secret(&secrets.reset),
            algorithm: Algorithm::HS256,
            clock,
        }
    }

    /// Issue a short-lived access token.
    ///
    /// # Arguments
    /// * `id` - Subject user identifier
    /// * `name` - Display name of the user
    /// * `email` - Email of the user
    ///
    /// # Returns
    /// Signed token and its expiry
    ///
    /// # Errors
    /// * `SigningFailed` - Token encoding failed
    pub fn issue_access(
        &self,
        id: impl ToString,
        name: &str,
        email: &str,
    ) -> Result<IssuedToken, TokenError> {
        let expires_at = self.expiry(ACCESS_TOKEN_TTL_SECS);
        let claims = AccessClaims {
            id: id.to_string(),
            name: name.to_string(),
            email: email.to_string(),
            exp: expires_at.timestamp(),
        };

        self.sign(&claims, &self.access, expires_at)
    }

    /// Issue a refresh token.
    ///
    /// # Arguments
    /// * `id` - Subject user identifier
    ///
    /// # Returns
    /// Signed token and its expiry
    ///
    /// # Errors
    /// * `SigningFailed` - Token encoding failed
    pub fn issue_refresh(&self, id: impl ToString) -> Result<IssuedToken, TokenError> {
        let expires_at = self.expiry(REFRESH_TOKEN_TTL_SECS);
        let claims = RefreshClaims {
            id: id.to_string(),
            exp: expires_at.timestamp(),
        };

        self.sign(&claims, &self.refresh, expires_at)
    }

    /// Issue a password reset token.
    ///
    /// # Arguments
    /// * `email` - Email of the account being reset
    ///
    /// # Returns
    /// Signed token and its expiry
    ///
    /// # Errors
    /// * `SigningFailed` - Token encoding failed
    pub fn issue_reset(&self, email: &str) -> Result<IssuedToken, TokenError> {
        let expires_at = self.expiry(RESET_TOKEN_TTL_SECS);
        let claims = ResetClaims {
            email: email.to_string(),
            jti: Uuid::new_v4().to_string(),
            exp: expires_at.timestamp(),
        };

        self.sign(&claims, &self.reset, expires_at)
    }

    /// Verify an access token and extract its claims.
    ///
    /// # Errors
    /// * `Malformed` - Token is not a well-formed JWT
    /// * `SignatureMismatch` - Token was not signed with the access secret
    /// * `Expired` - Token is past its expiry
    /// * `MissingField` - `id`, `name`, `email` or `exp` is absent
    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, TokenError> {
        let claims = self.decode_raw(token, &self.access)?.into_access()?;
        self.ensure_not_expired(claims.exp)?;
        Ok(claims)
    }

    /// Verify a refresh token and extract its claims.
    ///
    /// # Errors
    /// * `Malformed` - Token is not a well-formed JWT
    /// * `SignatureMismatch` - Token was not signed with the refresh secret
    /// * `Expired` - Token is past its expiry
    /// * `MissingField` - `id` or `exp` is absent
    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        let claims = self.decode_raw(token, &self.refresh)?.into_refresh()?;
        self.ensure_not_expired(claims.exp)?;
        Ok(claims)
    }

    /// Verify a password reset token and extract its claims.
    ///
    /// # Errors
    /// * `Malformed` - Token is not a well-formed JWT
    /// * `SignatureMismatch` - Token was not signed with the reset secret
    /// * `Expired` - Token is past its expiry
    /// * `MissingField` - `email`, `jti` or `exp` is absent
    pub fn verify_reset(&self, token: &str) -> Result<ResetClaims, TokenError> {
        let claims = self.decode_raw(token, &self.reset)?.into_reset()?;
        self.ensure_not_expired(claims.exp)?;
        Ok(claims)
    }

    fn expiry(&self, ttl_secs: i64) -> DateTime<Utc> {
        self.clock.now() + Duration::seconds(ttl_secs)
    }

    fn sign<T: Serialize>(
        &self,
        claims: &T,
        keys: &SigningKeys,
        expires_at: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError> {
        let header = Header::new(self.algorithm);

        encode(&header, claims, &keys.encoding)
            .map(|token| IssuedToken { token, expires_at })
            .map_err(|e| TokenError::SigningFailed(e.to_string()))
    }

    fn decode_raw(&self, token: &str, keys: &SigningKeys) -> Result<RawClaims, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        // Expiry is checked against the injected clock instead
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let token_data = decode::<RawClaims>(token, &keys.decoding, &validation)?;
        Ok(token_data.claims)
    }

    fn ensure_not_expired(&self, exp: i64) -> Result<(), TokenError> {
        if RawClaims::is_expired(exp, self.clock.now().timestamp()) {
            Err(TokenError::Expired)
        } else {
            Ok(())
        }
    }
}
