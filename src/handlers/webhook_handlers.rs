use actix_web::{HttpResponse, web};
use serde_json::json;
use uuid::Uuid;

use crate::db::repositories::OrganizationStore;
use crate::error::AppError;
use crate::handlers::org_context::resolve_org_id;
use crate::models::AuthenticatedUser;
use crate::models::webhook::CreateWebhookRequest;
use crate::services::webhook_service::WebhookService;

/// POST /v1/webhooks/endpoints
pub async fn create_webhook(
    user: web::ReqData<AuthenticatedUser>,
    body: web::Json<CreateWebhookRequest>,
    organizations: web::Data<dyn OrganizationStore>,
    webhooks: web::Data<WebhookService>,
) -> Result<HttpResponse, AppError> {
    let org_id = resolve_org_id(organizations.get_ref(), &user).await?;
    let webhook = webhooks.create(&org_id, &user.user_id, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(webhook))
}

/// GET /v1/webhooks/endpoints
pub async fn list_webhooks(
    user: web::ReqData<AuthenticatedUser>,
    organizations: web::Data<dyn OrganizationStore>,
    webhooks: web::Data<WebhookService>,
) -> Result<HttpResponse, AppError> {
    let org_id = resolve_org_id(organizations.get_ref(), &user).await?;
    Ok(HttpResponse::Ok().json(webhooks.find_all(&org_id).await?))
}

/// DELETE /v1/webhooks/endpoints/{id}
pub async fn delete_webhook(
    user: web::ReqData<AuthenticatedUser>,
    webhook_id: web::Path<Uuid>,
    organizations: web::Data<dyn OrganizationStore>,
    webhooks: web::Data<WebhookService>,
) -> Result<HttpResponse, AppError> {
    let org_id = resolve_org_id(organizations.get_ref(), &user).await?;
    webhooks.delete(&webhook_id, &org_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Webhook deleted successfully" })))
}

/// POST /v1/webhooks/endpoints/{id}/rotate-secret
pub async fn rotate_webhook_secret(
    user: web::ReqData<AuthenticatedUser>,
    webhook_id: web::Path<Uuid>,
    organizations: web::Data<dyn OrganizationStore>,
    webhooks: web::Data<WebhookService>,
) -> Result<HttpResponse, AppError> {
    let org_id = resolve_org_id(organizations.get_ref(), &user).await?;
    let secret = webhooks.rotate_secret(&webhook_id, &org_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "id": *webhook_id, "secret": secret })))
}
