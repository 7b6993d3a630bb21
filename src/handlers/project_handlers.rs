//! Project actions shared by the dashboard (`/v1/projects`) and the public
//! API (`/v1/public/projects`). The caller's organization comes from the
//! API key when present, otherwise from the user's membership.

use actix_web::{HttpResponse, web};
use log::info;
use uuid::Uuid;

use crate::db::repositories::OrganizationStore;
use crate::error::AppError;
use crate::handlers::org_context::resolve_org_id;
use crate::models::AuthenticatedUser;
use crate::services::ingestion_service::{IngestRequest, IngestionService};
use crate::services::transcription_service::TranscriptionService;

/// POST .../projects/{id}/ingest
pub async fn ingest_project(
    user: web::ReqData<AuthenticatedUser>,
    project_id: web::Path<Uuid>,
    body: Option<web::Json<IngestRequest>>,
    organizations: web::Data<dyn OrganizationStore>,
    ingestion: web::Data<IngestionService>,
) -> Result<HttpResponse, AppError> {
    let org_id = resolve_org_id(organizations.get_ref(), &user).await?;
    let request = body.map(web::Json::into_inner).unwrap_or_default();

    let response = ingestion.ingest(&project_id, &org_id, request).await?;
    Ok(HttpResponse::Accepted().json(response))
}

/// POST .../projects/{id}/transcribe
pub async fn transcribe_project(
    user: web::ReqData<AuthenticatedUser>,
    project_id: web::Path<Uuid>,
    organizations: web::Data<dyn OrganizationStore>,
    transcription: web::Data<TranscriptionService>,
) -> Result<HttpResponse, AppError> {
    let org_id = resolve_org_id(organizations.get_ref(), &user).await?;

    info!("Transcription requested for project {} by user {}", project_id, user.user_id);
    let started = transcription.start_transcription(&project_id, &org_id).await?;
    Ok(HttpResponse::Accepted().json(started))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use actix_web::dev::Service;
    use actix_web::http::StatusCode;
    use actix_web::{App, HttpMessage, test};
    use serde_json::{Value, json};

    use crate::db::repositories::InMemoryStore;
    use crate::services::proxy_token_service::ProxyTokenService;

    macro_rules! init_app {
        ($store:expr, $org:expr) => {{
            let store: Arc<InMemoryStore> = $store.clone();
            let org: Uuid = $org;
            let organizations: Arc<dyn OrganizationStore> = store.clone();
            let transcription = TranscriptionService::new(
                store.clone(),
                store.clone(),
                Arc::new(ProxyTokenService::new("project-handler-secret-0123456789", 900)),
                None,
                "http://localhost:8080",
            );
            test::init_service(
                App::new()
                    .app_data(web::Data::from(organizations))
                    .app_data(web::Data::new(IngestionService::new(store.clone(), store.clone())))
                    .app_data(web::Data::new(transcription))
                    .wrap_fn(move |req, srv| {
                        req.extensions_mut().insert(AuthenticatedUser {
                            user_id: Uuid::new_v4(),
                            org_id: Some(org),
                            authenticated_via_api_key: true,
                            api_key_id: Some(Uuid::new_v4()),
                        });
                        srv.call(req)
                    })
                    .route("/v1/public/projects/{id}/ingest", web::post().to(ingest_project))
                    .route("/v1/public/projects/{id}/transcribe", web::post().to(transcribe_project)),
            )
            .await
        }};
    }

    #[actix_web::test]
    async fn test_ingest_via_api_key_org() {
        let store = Arc::new(InMemoryStore::new());
        let org = Uuid::new_v4();
        let project = store.add_project(org, None);
        let app = init_app!(store, org);

        let req = test::TestRequest::post()
            .uri(&format!("/v1/public/projects/{}/ingest", project))
            .set_json(json!({ "sourceUrl": "https://s3/clipforge/u/a.mp4", "mimeType": "video/mp4" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "ingesting");
        assert!(body["assetId"].is_string());
    }

    #[actix_web::test]
    async fn test_ingest_foreign_project_is_not_found() {
        let store = Arc::new(InMemoryStore::new());
        let project = store.add_project(Uuid::new_v4(), None);
        let app = init_app!(store, Uuid::new_v4());

        let req = test::TestRequest::post()
            .uri(&format!("/v1/public/projects/{}/ingest", project))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_transcribe_when_disabled() {
        let store = Arc::new(InMemoryStore::new());
        let org = Uuid::new_v4();
        let project = store.add_project(org, Some("https://s3/clipforge/u/a.mp4"));
        let app = init_app!(store, org);

        let req = test::TestRequest::post()
            .uri(&format!("/v1/public/projects/{}/transcribe", project))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = test::read_body_json(resp).await;
        assert!(body["message"].as_str().unwrap().contains("Transcription is not configured"));
    }
}
