use crate::error::AppError;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Prefix carried by every issued API key.
pub const API_KEY_PREFIX: &str = "cf_";

/// Hashes an API key using HMAC-SHA256 keyed with the server-side hash secret.
///
/// The hash is deterministic so keys can be looked up by an indexed column
/// instead of comparing against every stored row.
///
/// # Returns
/// * `Result<String, AppError>` - Hex-encoded hash or error
pub fn hash_api_key(raw_key: &str, secret: &str) -> Result<String, AppError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Internal(format!("Failed to create HMAC: {}", e)))?;

    mac.update(raw_key.as_bytes());

    let result = mac.finalize();
    Ok(hex::encode(result.into_bytes()))
}

/// Generates a new API key using cryptographically secure random bytes
///
/// # Returns
/// * `String` - `cf_` followed by 64 hex characters (32 random bytes)
pub fn generate_api_key() -> String {
    let mut key_bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut key_bytes);
    format!("{}{}", API_KEY_PREFIX, hex::encode(key_bytes))
}

/// Returns true when the value has the shape of an issued key.
pub fn looks_like_api_key(value: &str) -> bool {
    value
        .strip_prefix(API_KEY_PREFIX)
        .is_some_and(|rest| rest.len() == 64 && rest.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Compares two strings in constant time to prevent timing attacks
pub fn constant_time_equal(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}
