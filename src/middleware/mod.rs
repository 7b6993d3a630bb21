pub mod api_key_auth;
pub mod auth_types;
pub mod rate_limiting;
pub mod secure_auth;

pub use api_key_auth::ApiKeyAuth;
pub use auth_types::ApiKeyIdentity;
pub use rate_limiting::{
    RateLimitMiddleware,
    RateLimitStorage,
    create_rate_limit_storage,
    start_memory_store_cleanup_task,
};
pub use secure_auth::SecureAuthentication;
