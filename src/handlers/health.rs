use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};

use crate::config::AppSettings;

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    status: String,
    service: String,
    version: String,
}

/// GET /health
///
/// Unauthenticated liveness probe. Reports nothing beyond name and version.
pub async fn health_check(settings: web::Data<AppSettings>) -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
        service: settings.app.name.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
