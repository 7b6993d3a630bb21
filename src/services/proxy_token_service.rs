use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use log::{debug, error, warn};
use uuid::Uuid;

use crate::config::AppSettings;
use crate::error::AppError;
use crate::models::proxy_token::{
    PROXY_TOKEN_AUDIENCE, PROXY_TOKEN_ISSUER, PROXY_TOKEN_TYPE, ProxyTokenClaims,
};

/// Default proxy token lifetime: 15 minutes.
pub const DEFAULT_PROXY_TOKEN_LIFETIME_SECS: i64 = 15 * 60;

/// Mints and verifies short-lived tokens that let the transcription provider
/// pull one media asset through the proxy endpoint.
///
/// Tokens are valid for a time window only; they are not single-use.
pub struct ProxyTokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_lifetime_secs: i64,
}

impl ProxyTokenService {
    pub fn new(secret: &str, token_lifetime_secs: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            token_lifetime_secs,
        }
    }

    pub fn from_settings(settings: &AppSettings) -> Self {
        Self::new(&settings.auth.jwt_secret, settings.proxy.token_lifetime_secs)
    }

    /// Generate a short-lived token for media proxy access
    pub fn generate_token(&self, asset_id: Uuid, project_id: Uuid, org_id: Uuid) -> Result<String, AppError> {
        self.generate_token_at(asset_id, project_id, org_id, Utc::now().timestamp())
    }

    pub(crate) fn generate_token_at(
        &self,
        asset_id: Uuid,
        project_id: Uuid,
        org_id: Uuid,
        issued_at: i64,
    ) -> Result<String, AppError> {
        let claims = ProxyTokenClaims {
            asset_id,
            project_id,
            org_id,
            token_type: PROXY_TOKEN_TYPE.to_string(),
            iss: PROXY_TOKEN_ISSUER.to_string(),
            aud: PROXY_TOKEN_AUDIENCE.to_string(),
            iat: issued_at,
            exp: issued_at + self.token_lifetime_secs,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(|e| {
            error!("Failed to generate proxy token: {}", e);
            AppError::Internal(format!("Proxy token generation failed: {}", e))
        })?;

        debug!(
            "Generated proxy token for asset {} (expires in {}s)",
            asset_id, self.token_lifetime_secs
        );
        Ok(token)
    }

    /// Validate and decode a proxy token.
    ///
    /// Signature, issuer, audience, expiry and the token type are all checked;
    /// every failure surfaces as `AppError::Unauthorized`.
    pub fn validate_token(&self, token: &str) -> Result<ProxyTokenClaims, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[PROXY_TOKEN_ISSUER]);
        validation.set_audience(&[PROXY_TOKEN_AUDIENCE]);
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);
        validation.leeway = 0;

        let token_data = decode::<ProxyTokenClaims>(token, &self.decoding_key, &validation).map_err(|err| {
            match err.kind() {
                ErrorKind::ExpiredSignature => {
                    warn!("Proxy token expired");
                    AppError::Unauthorized("Token expired".to_string())
                }
                kind => {
                    warn!("Invalid proxy token: {:?}", kind);
                    AppError::Unauthorized("Invalid token".to_string())
                }
            }
        })?;

        let claims = token_data.claims;
        if claims.token_type != PROXY_TOKEN_TYPE {
            warn!("Proxy token has unexpected type '{}'", claims.token_type);
            return Err(AppError::Unauthorized("Invalid token type".to_string()));
        }

        debug!("Validated proxy token for asset {}", claims.asset_id);
        Ok(claims)
    }

    /// Full proxy URL with an embedded token, e.g.
    /// `https://api.clipforge.com/internal/assemblyai/pull/{asset}?token=...`
    pub fn generate_proxy_url(
        &self,
        asset_id: Uuid,
        project_id: Uuid,
        org_id: Uuid,
        base_url: &str,
    ) -> Result<String, AppError> {
        let token = self.generate_token(asset_id, project_id, org_id)?;
        Ok(format!(
            "{}/internal/assemblyai/pull/{}?token={}",
            base_url.trim_end_matches('/'),
            asset_id,
            token
        ))
    }
}
