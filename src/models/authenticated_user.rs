use actix_web::{dev::Payload, Error, FromRequest, HttpRequest, HttpMessage};
use serde::{Deserialize, Serialize};
use std::future::{ready, Ready};
use uuid::Uuid;

/// Caller identity placed in request extensions by the auth middlewares.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    /// Set when the caller authenticated with an API key, which is bound to one org
    pub org_id: Option<Uuid>,
    pub authenticated_via_api_key: bool,
    pub api_key_id: Option<Uuid>,
}

impl FromRequest for AuthenticatedUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        if let Some(user) = req.extensions().get::<AuthenticatedUser>() {
            ready(Ok(user.clone()))
        } else {
            ready(Err(actix_web::error::ErrorUnauthorized("Not authenticated")))
        }
    }
}
