/// docshare crypto library
///
/// Random identifiers and secrets for users, shares and bootstrap tokens,
/// plus password hashing for password-gated shares.
///
/// All randomness comes from the OS CSPRNG. A failure to obtain it is
/// surfaced as `CryptoError::Random` and must fail the calling operation.

pub mod ids;
pub mod password;

pub use ids::{api_token, hex_token, share_id, user_id};
pub use password::{hash_password, verify_password};

#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("failed to obtain randomness: {0}")]
    Random(String),

    #[error("password hashing failed: {0}")]
    Hash(String),
}

pub type Result<T> = std::result::Result<T, CryptoError>;
