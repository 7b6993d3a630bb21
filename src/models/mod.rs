pub mod api_key;
pub mod auth_jwt_claims;
pub mod authenticated_user;
pub mod organization;
pub mod project;
pub mod proxy_token;
pub mod transcript;
pub mod webhook;

pub use auth_jwt_claims::*;
pub use authenticated_user::AuthenticatedUser;
