//! Credential utilities shared by services.
//!
//! - Password hashing (Argon2id)
//! - Purpose-scoped JWTs: access, refresh and password reset tokens, each
//!   signed with its own secret
//!
//! # Examples
//!
//! ## Password Hashing
//! ```
//! use auth::PasswordHasher;
//!
//! let hasher = PasswordHasher::new();
//! let hash = hasher.hash("my_password").unwrap();
//! assert!(hasher.compare("my_password", &hash).is_ok());
//! ```
//!
//! ## Tokens
//! ```
//! use auth::{TokenCodec, TokenSecrets};
//!
//! let secrets = TokenSecrets::new("access-secret", "refresh-secret", "reset-secret").unwrap();
//! let codec = TokenCodec::new(&secrets);
//!
//! let issued = codec.issue_reset("alice@example.com").unwrap();
//! let claims = codec.verify_reset(&issued.token).unwrap();
//! assert_eq!(claims.email, "alice@example.com");
//!
//! // A reset token never passes as an access token
//! assert!(codec.verify_access(&issued.token).is_err());
//! ```

pub mod password;
pub mod token;

// Re-export commonly used items
pub use password::PasswordError;
pub use password::PasswordHasher;
pub use token::AccessClaims;
pub use token::Clock;
pub use token::IssuedToken;
pub use token::ManualClock;
pub use token::RefreshClaims;
pub use token::ResetClaims;
pub use token::SecretsError;
pub use token::SystemClock;
pub use token::TokenCodec;
pub use token::TokenError;
pub use token::TokenSecrets;
pub use token::ACCESS_TOKEN_TTL_SECS;
pub use token::REFRESH_TOKEN_TTL_SECS;
pub use token::RESET_TOKEN_TTL_SECS;
