use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const PROXY_TOKEN_ISSUER: &str = "clipforge-api";
pub const PROXY_TOKEN_AUDIENCE: &str = "assemblyai-proxy";
pub const PROXY_TOKEN_TYPE: &str = "media-proxy";

/// Claims of a media proxy token. Not persisted anywhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyTokenClaims {
    pub asset_id: Uuid,
    pub project_id: Uuid,
    pub org_id: Uuid,
    #[serde(rename = "type")]
    pub token_type: String,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}
