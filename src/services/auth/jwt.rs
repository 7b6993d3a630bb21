use crate::error::AppError;
use crate::models::auth_jwt_claims::Claims;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use log::{debug, info, trace};

// Issuer name for JWT tokens
pub const JWT_ISSUER: &str = "clipforge-api";

/// HS256 verification key for dashboard session tokens. Tokens are issued by the dashboard.
#[derive(Clone)]
pub struct JwtKeys {
    decoding_key: DecodingKey,
    #[cfg(test)]
    encoding_key: jsonwebtoken::EncodingKey,
}

impl JwtKeys {
    pub fn from_secret(jwt_secret: &str) -> Self {
        info!("Initializing JWT keys from configuration");
        Self {
            decoding_key: DecodingKey::from_secret(jwt_secret.as_bytes()),
            #[cfg(test)]
            encoding_key: jsonwebtoken::EncodingKey::from_secret(jwt_secret.as_bytes()),
        }
    }

    /// Signs a dashboard-style token for middleware and handler tests.
    #[cfg(test)]
    pub fn create_token(
        &self,
        user_id: uuid::Uuid,
        role: &str,
        email: &str,
        token_duration_days: i64,
    ) -> Result<String, AppError> {
        use chrono::{Duration, Utc};
        use jsonwebtoken::{Header, encode};

        let iat_dt = Utc::now();
        let exp_dt = iat_dt + Duration::days(token_duration_days);
        let claims = Claims {
            sub: user_id.to_string(),
            exp: exp_dt.timestamp() as usize,
            iat: iat_dt.timestamp() as usize,
            iss: Some(JWT_ISSUER.to_string()),
            email: email.to_string(),
            role: role.to_string(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Token creation failed: {}", e)))
    }

    /// Verify a JWT token and extract the claims
    pub fn verify_token(&self, token: &str) -> Result<Claims, AppError> {
        trace!("Verifying JWT token");

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[JWT_ISSUER]); // Trust only our issuer

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|err| {
            debug!("JWT validation failed: {}", err);
            match err.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::Auth("Token has expired".to_string()),
                jsonwebtoken::errors::ErrorKind::InvalidToken => AppError::Auth("Invalid token format".to_string()),
                jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                    AppError::Auth("Invalid token signature".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidIssuer => AppError::Auth("Invalid token issuer".to_string()),
                jsonwebtoken::errors::ErrorKind::MissingRequiredClaim(claim) => {
                    AppError::Auth(format!("Token missing required claim: {}", claim))
                }
                _ => AppError::Auth(format!("Token validation failed: {:?}", err.kind())),
            }
        })?;

        debug!("JWT token verified successfully for user {}", token_data.claims.sub);
        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    const SECRET: &str = "jwt-unit-test-secret-0123456789abcdef";

    #[test]
    fn test_create_and_verify() {
        let keys = JwtKeys::from_secret(SECRET);
        let user = Uuid::new_v4();
        let token = keys.create_token(user, "user", "a@example.com", 30).unwrap();

        let claims = keys.verify_token(&token).unwrap();
        assert_eq!(claims.sub, user.to_string());
        assert_eq!(claims.iss.as_deref(), Some(JWT_ISSUER));
        assert_eq!(claims.email, "a@example.com");
        assert_eq!(claims.exp - claims.iat, 30 * 24 * 3600);
    }

    #[test]
    fn test_rejects_foreign_tokens() {
        let token = JwtKeys::from_secret("a-completely-different-secret-value")
            .create_token(Uuid::new_v4(), "user", "a@example.com", 1)
            .unwrap();
        assert!(matches!(
            JwtKeys::from_secret(SECRET).verify_token(&token),
            Err(AppError::Auth(_))
        ));
    }

    #[test]
    fn test_rejects_expired_tokens() {
        let keys = JwtKeys::from_secret(SECRET);
        let token = keys.create_token(Uuid::new_v4(), "user", "a@example.com", -1).unwrap();
        match keys.verify_token(&token) {
            Err(AppError::Auth(msg)) => assert_eq!(msg, "Token has expired"),
            other => panic!("expected expiry error, got {:?}", other),
        }
    }
}
