use rand_core::{OsRng, RngCore};

use crate::{CryptoError, Result};

/// Literal prefix of every user id.
pub const USER_ID_PREFIX: &str = "user_";

/// Byte length of API and bootstrap tokens (64 hex chars).
pub const TOKEN_BYTES: usize = 32;

/// Byte length of share ids, user id suffixes and bootstrap row ids.
pub const ID_BYTES: usize = 16;

/// `2n` lowercase hex chars over `n` random bytes.
pub fn hex_token(n: usize) -> Result<String> {
    let mut bytes = vec![0u8; n];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| CryptoError::Random(e.to_string()))?;
    Ok(hex::encode(bytes))
}

/// 32-char hex share id.
pub fn share_id() -> Result<String> {
    hex_token(ID_BYTES)
}

/// `user_` followed by 32 hex chars.
pub fn user_id() -> Result<String> {
    Ok(format!("{}{}", USER_ID_PREFIX, hex_token(ID_BYTES)?))
}

/// API token handed to a user at creation time.
pub fn api_token() -> Result<String> {
    hex_token(TOKEN_BYTES)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_lower_hex(s: &str) -> bool {
        s.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
    }

    #[test]
    fn hex_token_length_doubles_byte_count() {
        for n in [1, 16, 32] {
            let token = hex_token(n).unwrap();
            assert_eq!(token.len(), n * 2);
            assert!(is_lower_hex(&token));
        }
    }

    #[test]
    fn share_id_is_32_hex() {
        let id = share_id().unwrap();
        assert_eq!(id.len(), 32);
        assert!(is_lower_hex(&id));
    }

    #[test]
    fn user_id_has_prefix() {
        let id = user_id().unwrap();
        let suffix = id.strip_prefix(USER_ID_PREFIX).unwrap();
        assert_eq!(suffix.len(), 32);
        assert!(is_lower_hex(suffix));
    }

    #[test]
    fn tokens_do_not_repeat() {
        assert_ne!(api_token().unwrap(), api_token().unwrap());
    }
}
