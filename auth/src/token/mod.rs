pub mod claims;
pub mod clock;
pub mod codec;
pub mod errors;
pub mod secrets;

pub use claims::AccessClaims;
pub use claims::IssuedToken;
pub use claims::RefreshClaims;
pub use claims::ResetClaims;
pub use claims::ACCESS_TOKEN_TTL_SECS;
pub use claims::REFRESH_TOKEN_TTL_SECS;
pub use claims::RESET_TOKEN_TTL_SECS;
pub use clock::Clock;
pub use clock::ManualClock;
pub use clock::SystemClock;
pub use codec::TokenCodec;
pub use errors::SecretsError;
pub use errors::TokenError;
pub use secrets::TokenSecrets;
