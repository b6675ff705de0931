use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use super::errors::TokenError;

/// Lifetime of an access token in seconds.
pub const ACCESS_TOKEN_TTL_SECS: i64 = 200;

/// Lifetime of a refresh token in seconds.
pub const REFRESH_TOKEN_TTL_SECS: i64 = 2 * 60 * 60;

/// Lifetime of a password reset token in seconds.
pub const RESET_TOKEN_TTL_SECS: i64 = 60 * 60;

/// Claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessClaims {
    /// Subject user identifier
    pub id: String,
    pub name: String,
    pub email: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// Claims carried by a refresh token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RefreshClaims {
    /// Subject user identifier
    pub id: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// Claims carried by a password reset token.
///
/// `jti` is random per issue, so two resets requested within the same
/// second still yield distinct tokens.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResetClaims {
    pub email: String,
    /// Unique token identifier
    pub jti: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// A signed token together with the instant it stops being valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Claim set as found on the wire, before required fields are checked.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawClaims {
    pub id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub jti: Option<String>,
    pub exp: Option<i64>,
}

impl RawClaims {
    /// Check if token is expired.
    pub fn is_expired(exp: i64, current_timestamp: i64) -> bool {
        exp < current_timestamp
    }

    fn required<T>(value: Option<T>, name: &'static str) -> Result<T, TokenError> {
        value.ok_or(TokenError::MissingField(name))
    }

    pub fn into_access(self) -> Result<AccessClaims, TokenError> {
        Ok(AccessClaims {
            id: Self::required(self.id, "id")?,
            name: Self::required(self.name, "name")?,
            email: Self::required(self.email, "email")?,
            exp: Self::required(self.exp, "exp")?,
        })
    }

    pub fn into_refresh(self) -> Result<RefreshClaims, TokenError> {
        Ok(RefreshClaims {
            id: Self::required(self.id, "id")?,
            exp: Self::required(self.exp, "exp")?,
        })
    }

    pub fn into_reset(self) -> Result<ResetClaims, TokenError> {
        Ok(ResetClaims {
            email: Self::required(self.email, "email")?,
            jti: Self::required(self.jti, "jti")?,
            exp: Self::required(self.exp, "exp")?,
        })
    }
}
