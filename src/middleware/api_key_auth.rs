use actix_web::{
    Error, HttpMessage, ResponseError,
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    http::{Method, header},
};
use futures_util::future::{Ready, ok};
use log::{debug, error, warn};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use crate::error::AppError;
use crate::middleware::auth_types::ApiKeyIdentity;
use crate::models::AuthenticatedUser;
use crate::services::api_key_service::ApiKeyService;

/// Extract API key from request headers
/// Priority: X-API-Key header, then Authorization: Bearer <key>
fn extract_api_key(req: &ServiceRequest) -> Result<String, AppError> {
    if let Some(api_key_header) = req.headers().get("x-api-key") {
        if let Ok(api_key_str) = api_key_header.to_str() {
            let trimmed = api_key_str.trim();
            if !trimmed.is_empty() {
                return Ok(trimmed.to_string());
            }
        }
    }

    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".to_string()))?;

    let invalid_format = || AppError::Unauthorized("Invalid Authorization header format".to_string());
    let auth_str = auth_header.to_str().map_err(|_| invalid_format())?;

    let mut parts = auth_str.split(' ');
    match (parts.next(), parts.next()) {
        (Some("Bearer"), Some(key)) if !key.is_empty() => Ok(key.to_string()),
        _ => Err(invalid_format()),
    }
}

async fn authenticate(req: &ServiceRequest, api_keys: &ApiKeyService) -> Result<ApiKeyIdentity, AppError> {
    let raw_key = extract_api_key(req)?;

    let record = api_keys.validate_api_key(&raw_key).await.map_err(|e| {
        error!("Failed to look up API key: {}", e);
        AppError::Internal("Failed to authenticate API key".to_string())
    })?;

    let Some(record) = record else {
        warn!("Invalid or expired API key attempted for path: {}", req.path());
        return Err(AppError::Unauthorized("Invalid or expired API key".to_string()));
    };

    Ok(ApiKeyIdentity {
        api_key_id: record.id,
        org_id: record.org_id,
        user_id: record.user_id,
        rate_limit: record.rate_limit,
        name: record.name,
    })
}

/// Authenticates `/v1/public` requests with an organization API key.
///
/// On success both `ApiKeyIdentity` (read by the rate limiter) and
/// `AuthenticatedUser` are placed in the request extensions.
#[derive(Clone)]
pub struct ApiKeyAuth {
    api_keys: ApiKeyService,
}

impl ApiKeyAuth {
    pub fn new(api_keys: ApiKeyService) -> Self {
        Self { api_keys }
    }
}

impl<S, B> Transform<S, ServiceRequest> for ApiKeyAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = ApiKeyAuthService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(ApiKeyAuthService {
            service: Rc::new(service),
            api_keys: self.api_keys.clone(),
        })
    }
}

pub struct ApiKeyAuthService<S> {
    service: Rc<S>,
    api_keys: ApiKeyService,
}

impl<S, B> Service<ServiceRequest> for ApiKeyAuthService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let api_keys = self.api_keys.clone();

        Box::pin(async move {
            // Skip authentication for OPTIONS requests (CORS preflight)
            if req.method() == Method::OPTIONS {
                debug!("Skipping API key authentication for OPTIONS request to: {}", req.path());
                return service.call(req).await.map(ServiceResponse::map_into_left_body);
            }

            match authenticate(&req, &api_keys).await {
                Ok(identity) => {
                    debug!("API key {} authenticated for {}", identity.api_key_id, req.path());

                    req.extensions_mut().insert(AuthenticatedUser {
                        user_id: identity.user_id,
                        org_id: Some(identity.org_id),
                        authenticated_via_api_key: true,
                        api_key_id: Some(identity.api_key_id),
                    });
                    req.extensions_mut().insert(identity);

                    service.call(req).await.map(ServiceResponse::map_into_left_body)
                }
                Err(err) => {
                    let response = err.error_response();
                    Ok(req.into_response(response).map_into_right_body())
                }
            }
        })
    }
}
