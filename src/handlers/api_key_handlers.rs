use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::db::repositories::OrganizationStore;
use crate::error::AppError;
use crate::handlers::org_context::resolve_org_id;
use crate::models::AuthenticatedUser;
use crate::services::api_key_service::ApiKeyService;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateApiKeyRequest {
    pub name: Option<String>,
    pub expires_in_days: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateApiKeyRequest {
    pub name: String,
}

/// POST /v1/api-keys
pub async fn create_api_key(
    user: web::ReqData<AuthenticatedUser>,
    body: Option<web::Json<CreateApiKeyRequest>>,
    organizations: web::Data<dyn OrganizationStore>,
    api_keys: web::Data<ApiKeyService>,
) -> Result<HttpResponse, AppError> {
    let org_id = resolve_org_id(organizations.get_ref(), &user).await?;

    if !api_keys.can_create_api_key(&org_id).await? {
        return Err(AppError::BadRequest(
            "API key limit reached for your plan. Please upgrade to create more keys.".to_string(),
        ));
    }

    let body = body.map(web::Json::into_inner).unwrap_or_default();
    let created = api_keys
        .generate_api_key(&org_id, &user.user_id, body.name, body.expires_in_days)
        .await?;

    Ok(HttpResponse::Created().json(json!({
        "message": "API key created successfully. Save this key - it will not be shown again!",
        "key": created.key,
        "id": created.id,
    })))
}

/// GET /v1/api-keys
pub async fn list_api_keys(
    user: web::ReqData<AuthenticatedUser>,
    organizations: web::Data<dyn OrganizationStore>,
    api_keys: web::Data<ApiKeyService>,
) -> Result<HttpResponse, AppError> {
    let org_id = resolve_org_id(organizations.get_ref(), &user).await?;
    let keys = api_keys.list_api_keys(&org_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "keys": keys })))
}

/// GET /v1/api-keys/stats
pub async fn get_api_key_stats(
    user: web::ReqData<AuthenticatedUser>,
    organizations: web::Data<dyn OrganizationStore>,
    api_keys: web::Data<ApiKeyService>,
) -> Result<HttpResponse, AppError> {
    let org_id = resolve_org_id(organizations.get_ref(), &user).await?;
    let stats = api_keys.get_api_key_stats(&org_id).await?;
    Ok(HttpResponse::Ok().json(stats))
}

/// PATCH /v1/api-keys/{id}
pub async fn update_api_key(
    user: web::ReqData<AuthenticatedUser>,
    key_id: web::Path<Uuid>,
    body: web::Json<UpdateApiKeyRequest>,
    organizations: web::Data<dyn OrganizationStore>,
    api_keys: web::Data<ApiKeyService>,
) -> Result<HttpResponse, AppError> {
    let org_id = resolve_org_id(organizations.get_ref(), &user).await?;
    api_keys.update_api_key(&key_id, &org_id, &body.name).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "API key updated successfully" })))
}

/// DELETE /v1/api-keys/{id}
pub async fn revoke_api_key(
    user: web::ReqData<AuthenticatedUser>,
    key_id: web::Path<Uuid>,
    organizations: web::Data<dyn OrganizationStore>,
    api_keys: web::Data<ApiKeyService>,
) -> Result<HttpResponse, AppError> {
    let org_id = resolve_org_id(organizations.get_ref(), &user).await?;
    api_keys.revoke_api_key(&key_id, &org_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "API key revoked successfully" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use actix_web::dev::Service;
    use actix_web::http::StatusCode;
    use actix_web::{App, HttpMessage, test};
    use serde_json::Value;

    use crate::db::repositories::InMemoryStore;
    use crate::models::api_key::Tier;

    macro_rules! init_app {
        ($store:expr, $user:expr) => {{
            let store: Arc<InMemoryStore> = $store.clone();
            let user: Uuid = $user;
            let organizations: Arc<dyn OrganizationStore> = store.clone();
            test::init_service(
                App::new()
                    .app_data(web::Data::from(organizations))
                    .app_data(web::Data::new(ApiKeyService::new(store.clone(), store.clone(), "handler-secret")))
                    .wrap_fn(move |req, srv| {
                        req.extensions_mut().insert(AuthenticatedUser {
                            user_id: user,
                            org_id: None,
                            authenticated_via_api_key: false,
                            api_key_id: None,
                        });
                        srv.call(req)
                    })
                    .service(
                        web::scope("/v1/api-keys")
                            .route("", web::post().to(create_api_key))
                            .route("", web::get().to(list_api_keys))
                            .route("/stats", web::get().to(get_api_key_stats))
                            .route("/{id}", web::patch().to(update_api_key))
                            .route("/{id}", web::delete().to(revoke_api_key)),
                    ),
            )
            .await
        }};
    }

    fn member_of(store: &InMemoryStore, tier: Tier) -> (Uuid, Uuid) {
        let org = store.add_org(tier);
        let user = Uuid::new_v4();
        store.add_member(user, org);
        (user, org)
    }

    #[actix_web::test]
    async fn test_create_list_and_revoke() {
        let store = Arc::new(InMemoryStore::new());
        let (user, _) = member_of(&store, Tier::Pro);
        let app = init_app!(store, user);

        let req = test::TestRequest::post()
            .uri("/v1/api-keys")
            .set_json(json!({ "name": "ci" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created: Value = test::read_body_json(resp).await;
        assert!(created["key"].as_str().unwrap().starts_with("cf_"));
        assert!(created["message"].as_str().unwrap().contains("will not be shown again"));
        let id = created["id"].as_str().unwrap().to_string();

        let req = test::TestRequest::get().uri("/v1/api-keys").to_request();
        let listed: Value = test::read_body_json(test::call_service(&app, req).await).await;
        assert_eq!(listed["keys"].as_array().unwrap().len(), 1);
        assert_eq!(listed["keys"][0]["name"], "ci");
        assert!(listed["keys"][0].get("keyHash").is_none());

        let req = test::TestRequest::patch()
            .uri(&format!("/v1/api-keys/{}", id))
            .set_json(json!({ "name": "renamed" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::delete()
            .uri(&format!("/v1/api-keys/{}", id))
            .to_request();
        let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
        assert_eq!(body["message"], "API key revoked successfully");

        let req = test::TestRequest::delete()
            .uri(&format!("/v1/api-keys/{}", id))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_create_respects_tier_allowance() {
        let store = Arc::new(InMemoryStore::new());
        let (user, _) = member_of(&store, Tier::Free);
        let app = init_app!(store, user);

        let first = test::TestRequest::post().uri("/v1/api-keys").to_request();
        assert_eq!(test::call_service(&app, first).await.status(), StatusCode::CREATED);

        let second = test::TestRequest::post().uri("/v1/api-keys").to_request();
        let resp = test::call_service(&app, second).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert!(body["message"].as_str().unwrap().contains("API key limit reached"));
    }

    #[actix_web::test]
    async fn test_create_rejects_out_of_range_expiry() {
        let store = Arc::new(InMemoryStore::new());
        let (user, _) = member_of(&store, Tier::Pro);
        let app = init_app!(store, user);

        let req = test::TestRequest::post()
            .uri("/v1/api-keys")
            .set_json(json!({ "expiresInDays": 1_000_000_000i64 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Validation error: expiresInDays is out of range");
        assert!(store.api_keys.is_empty());
    }

    #[actix_web::test]
    async fn test_user_without_org_is_rejected() {
        let store = Arc::new(InMemoryStore::new());
        let app = init_app!(store, Uuid::new_v4());

        let req = test::TestRequest::get().uri("/v1/api-keys/stats").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert!(body["message"].as_str().unwrap().contains("No organization found"));
    }
}
