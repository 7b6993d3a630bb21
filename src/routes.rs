use actix_web::web;

use crate::handlers;

/// Dashboard routes. Mounted under `/v1` and wrapped with `SecureAuthentication` in main.rs.
pub fn configure_dashboard_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api-keys")
            .route("", web::post().to(handlers::api_key_handlers::create_api_key))
            .route("", web::get().to(handlers::api_key_handlers::list_api_keys))
            .route("/stats", web::get().to(handlers::api_key_handlers::get_api_key_stats))
            .route("/{id}", web::patch().to(handlers::api_key_handlers::update_api_key))
            .route("/{id}", web::delete().to(handlers::api_key_handlers::revoke_api_key)),
    );

    cfg.service(
        web::scope("/webhooks/endpoints")
            .route("", web::post().to(handlers::webhook_handlers::create_webhook))
            .route("", web::get().to(handlers::webhook_handlers::list_webhooks))
            .route("/{id}", web::delete().to(handlers::webhook_handlers::delete_webhook))
            .route(
                "/{id}/rotate-secret",
                web::post().to(handlers::webhook_handlers::rotate_webhook_secret),
            ),
    );

    cfg.service(web::scope("/projects").configure(configure_project_routes));
}

/// Public API routes. Mounted under `/v1/public`, behind `ApiKeyAuth` and the rate limiter.
pub fn configure_public_api_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/me", web::get().to(handlers::public_api_handlers::get_api_key_identity));
    cfg.service(web::scope("/projects").configure(configure_project_routes));
}

fn configure_project_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/{id}/ingest", web::post().to(handlers::project_handlers::ingest_project))
        .route("/{id}/transcribe", web::post().to(handlers::project_handlers::transcribe_project));
}

/// Media pulled by AssemblyAI. Authorized by the proxy token in the query string.
pub fn configure_internal_routes(cfg: &mut web::ServiceConfig) {
    cfg.route(
        "/assemblyai/pull/{asset_id}",
        web::get().to(handlers::proxy_handlers::pull_media),
    );
}

/// Inbound provider callbacks (no authentication, optional signature).
pub fn configure_webhook_routes(cfg: &mut web::ServiceConfig) {
    cfg.route(
        "/assemblyai",
        web::post().to(handlers::assemblyai_webhook_handlers::assemblyai_webhook),
    );
}
