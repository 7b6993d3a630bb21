use actix_web::{
    Error, HttpMessage,
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    http::{Method, header::AUTHORIZATION},
};
use futures_util::future::{Ready, ok, ready};
use log::{debug, warn};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::AuthenticatedUser;
use crate::services::auth::jwt::JwtKeys;

/// Dashboard authentication: `Authorization: Bearer <user JWT>`.
///
/// On success an `AuthenticatedUser` is inserted into the request extensions. The organization is resolved later, per handler.
#[derive(Clone)]
pub struct SecureAuthentication {
    keys: Arc<JwtKeys>,
}

impl SecureAuthentication {
    pub fn new(keys: Arc<JwtKeys>) -> Self {
        Self { keys }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SecureAuthentication
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = SecureAuthenticationMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(SecureAuthenticationMiddleware {
            service: Arc::new(service),
            keys: self.keys.clone(),
        })
    }
}

#[derive(Clone)]
pub struct SecureAuthenticationMiddleware<S> {
    service: Arc<S>,
    keys: Arc<JwtKeys>,
}

fn bearer_token(req: &ServiceRequest) -> Result<String, AppError> {
    let auth_header = req
        .headers()
        .get(AUTHORIZATION)
        .ok_or_else(|| AppError::Auth("Missing Authorization header".to_string()))?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| AppError::Auth("Invalid Authorization header".to_string()))?;

    let token = auth_str
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Auth("Invalid Authorization format, expected Bearer token".to_string()))?
        .trim();

    if token.is_empty() {
        return Err(AppError::Auth("Empty Bearer token".to_string()));
    }
    Ok(token.to_string())
}

impl<S, B> Service<ServiceRequest> for SecureAuthenticationMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let path = req.path().to_string();

        // Skip auth check for OPTIONS requests (CORS pre-flight)
        if req.method() == Method::OPTIONS {
            debug!("Skipping authentication for OPTIONS request to: {}", path);
            return Box::pin(service.call(req));
        }

        let token = match bearer_token(&req) {
            Ok(token) => token,
            Err(e) => {
                warn!("Rejected request to {}: {}", path, e);
                return Box::pin(ready(Err(Error::from(e))));
            }
        };

        let claims = match self.keys.verify_token(&token) {
            Ok(claims) => claims,
            Err(e) => {
                warn!("JWT validation failed for route {}: {}", path, e);
                return Box::pin(ready(Err(Error::from(e))));
            }
        };

        let user_id = match Uuid::parse_str(&claims.sub) {
            Ok(uuid) => uuid,
            Err(_) => {
                warn!("Invalid user ID format in token for route {}", path);
                return Box::pin(ready(Err(Error::from(AppError::Auth(
                    "Invalid user ID format in token".to_string(),
                )))));
            }
        };

        debug!("JWT valid for user {} (Role: {}) for route {}", user_id, claims.role, path);

        req.extensions_mut().insert(AuthenticatedUser {
            user_id,
            org_id: None,
            authenticated_via_api_key: false,
            api_key_id: None,
        });

        Box::pin(service.call(req))
    }
}
