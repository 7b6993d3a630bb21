use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

use crate::error::AppError;
use crate::security::api_key_hashing::constant_time_equal;

type HmacSha256 = Hmac<Sha256>;

/// Hex HMAC-SHA256 of `body` keyed with `secret`.
pub fn sign_payload(secret: &str, body: &[u8]) -> Result<String, AppError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Internal(format!("Failed to create HMAC: {}", e)))?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Verifies a hex signature over the raw request body.
pub fn verify_signature(secret: &str, body: &[u8], signature: Option<&str>) -> Result<(), AppError> {
    let signature = match signature.map(str::trim) {
        Some(s) if !s.is_empty() => s,
        _ => return Err(AppError::BadRequest("Missing signature".to_string())),
    };

    let expected = sign_payload(secret, body)?;
    if !constant_time_equal(&expected, &signature.to_ascii_lowercase()) {
        return Err(AppError::BadRequest("Invalid signature".to_string()));
    }

    Ok(())
}

/// Random hex secret for signing outbound webhook payloads.
pub fn generate_webhook_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
