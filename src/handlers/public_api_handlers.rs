use actix_web::{HttpResponse, web};
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::ApiKeyIdentity;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyIdentityResponse {
    pub api_key_id: Uuid,
    pub name: String,
    pub org_id: Uuid,
    pub user_id: Uuid,
    pub rate_limit: i32,
}

/// GET /v1/public/me
pub async fn get_api_key_identity(identity: web::ReqData<ApiKeyIdentity>) -> Result<HttpResponse, AppError> {
    let identity = identity.into_inner();
    Ok(HttpResponse::Ok().json(ApiKeyIdentityResponse {
        api_key_id: identity.api_key_id,
        name: identity.name,
        org_id: identity.org_id,
        user_id: identity.user_id,
        rate_limit: identity.rate_limit,
    }))
}
