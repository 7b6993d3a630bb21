use uuid::Uuid;

/// Identity information for API key-authenticated requests
/// Used for rate limiting and for scoping public API calls to the key's org
#[derive(Clone, Debug)]
pub struct ApiKeyIdentity {
    pub api_key_id: Uuid,
    pub org_id: Uuid,
    pub user_id: Uuid,
    /// Requests per window
    pub rate_limit: i32,
    pub name: String,
}
