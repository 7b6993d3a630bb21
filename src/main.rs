use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware::Logger, web};
use dotenv::dotenv;
use std::net::TcpListener;
use std::sync::Arc;

use clipforge_server::config::AppSettings;
use clipforge_server::config::settings::StorageBackend;
use clipforge_server::db::connection::{create_pool, run_migrations, verify_connection};
use clipforge_server::db::repositories::{
    ApiKeyRepository, AssetRepository, OrganizationRepository, OrganizationStore, ProjectRepository, ProjectStore,
    TranscriptRepository, TranscriptStore, WebhookRepository,
};
use clipforge_server::handlers;
use clipforge_server::middleware::{
    ApiKeyAuth, RateLimitMiddleware, SecureAuthentication, create_rate_limit_storage,
    start_memory_store_cleanup_task,
};
use clipforge_server::routes;
use clipforge_server::services::api_key_service::ApiKeyService;
use clipforge_server::services::auth::jwt::JwtKeys;
use clipforge_server::services::ingestion_service::IngestionService;
use clipforge_server::services::proxy_token_service::ProxyTokenService;
use clipforge_server::services::storage::{LocalMediaStorage, MediaStorage, S3MediaStorage};
use clipforge_server::services::transcription_service::TranscriptionService;
use clipforge_server::services::webhook_service::WebhookService;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();

    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let app_settings = match AppSettings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            log::error!("Failed to load application settings: {}", e);
            log::error!("Cannot start server without valid settings");
            std::process::exit(1);
        }
    };

    let db_pool = match create_pool(&app_settings.database.url).await {
        Ok(pool) => {
            if let Err(e) = verify_connection(&pool).await {
                log::error!("Database connection verification failed: {}", e);
                log::error!("Cannot start server without a working database connection");
                std::process::exit(1);
            }
            pool
        }
        Err(e) => {
            log::error!("Failed to create database connection pool: {}", e);
            log::error!("Cannot start server without a working database connection");
            std::process::exit(1);
        }
    };

    if let Err(e) = run_migrations(&db_pool).await {
        log::error!("{}", e);
        std::process::exit(1);
    }

    // Repositories
    let organizations: Arc<dyn OrganizationStore> = Arc::new(OrganizationRepository::new(db_pool.clone()));
    let projects: Arc<dyn ProjectStore> = Arc::new(ProjectRepository::new(db_pool.clone()));
    let transcripts: Arc<dyn TranscriptStore> = Arc::new(TranscriptRepository::new(db_pool.clone()));
    let api_key_repository = Arc::new(ApiKeyRepository::new(db_pool.clone()));
    let asset_repository = Arc::new(AssetRepository::new(db_pool.clone()));
    let webhook_repository = Arc::new(WebhookRepository::new(db_pool.clone()));

    let media_storage: Arc<dyn MediaStorage> = match app_settings.storage.backend {
        StorageBackend::S3 => {
            log::info!("Using S3 media storage (bucket {})", app_settings.storage.bucket);
            Arc::new(S3MediaStorage::from_config(&app_settings.storage).await)
        }
        StorageBackend::Local => {
            log::info!("Using local media storage at {}", app_settings.storage.local_root);
            Arc::new(LocalMediaStorage::new(&app_settings.storage.local_root))
        }
    };

    // Services
    let jwt_keys = Arc::new(JwtKeys::from_secret(&app_settings.auth.jwt_secret));
    let proxy_tokens = Arc::new(ProxyTokenService::from_settings(&app_settings));
    let api_key_service = ApiKeyService::new(
        api_key_repository,
        organizations.clone(),
        &app_settings.auth.api_key_hash_secret,
    );
    let webhook_service = WebhookService::new(webhook_repository);
    let ingestion_service = IngestionService::new(projects.clone(), asset_repository);
    let transcription_service = match TranscriptionService::from_settings(
        &app_settings,
        projects.clone(),
        transcripts.clone(),
        proxy_tokens.clone(),
    ) {
        Ok(service) => service,
        Err(e) => {
            log::error!("Failed to initialize transcription service: {}", e);
            std::process::exit(1);
        }
    };

    let rate_limit_storage = match create_rate_limit_storage(&app_settings.rate_limit).await {
        Ok(storage) => storage,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };
    if rate_limit_storage.is_memory() {
        tokio::spawn(start_memory_store_cleanup_task(
            rate_limit_storage.clone(),
            app_settings.rate_limit.cleanup_interval_secs,
        ));
    }
    let rate_limiter = RateLimitMiddleware::new(&app_settings.rate_limit, rate_limit_storage);

    let server_addr = format!("{}:{}", app_settings.server.host, app_settings.server.port);
    log::info!("Starting server at http://{}", server_addr);
    let listener = TcpListener::bind(&server_addr)?;

    let settings_data = web::Data::new(app_settings.clone());
    let assemblyai_config = web::Data::new(app_settings.assemblyai.clone());
    let organizations_data = web::Data::from(organizations);
    let projects_data = web::Data::from(projects);
    let transcripts_data = web::Data::from(transcripts);
    let storage_data = web::Data::from(media_storage);
    let proxy_tokens_data = web::Data::from(proxy_tokens);
    let api_key_data = web::Data::new(api_key_service.clone());
    let webhook_data = web::Data::new(webhook_service);
    let ingestion_data = web::Data::new(ingestion_service);
    let transcription_data = web::Data::new(transcription_service);
    let cors_origins = app_settings.server.cors_origins.clone();

    HttpServer::new(move || {
        let mut cors = Cors::default().supports_credentials();
        if cors_origins.iter().any(|o| o == "*") {
            cors = cors.allow_any_origin();
        } else {
            for origin in &cors_origins {
                cors = cors.allowed_origin(origin);
            }
        }
        cors = cors.allow_any_method().allow_any_header().expose_headers(vec![
            "X-RateLimit-Limit",
            "X-RateLimit-Remaining",
            "X-RateLimit-Reset",
            "Retry-After",
        ]);

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .app_data(settings_data.clone())
            .app_data(assemblyai_config.clone())
            .app_data(organizations_data.clone())
            .app_data(projects_data.clone())
            .app_data(transcripts_data.clone())
            .app_data(storage_data.clone())
            .app_data(proxy_tokens_data.clone())
            .app_data(api_key_data.clone())
            .app_data(webhook_data.clone())
            .app_data(ingestion_data.clone())
            .app_data(transcription_data.clone())
            .service(web::resource("/health").route(web::get().to(handlers::health::health_check)))
            // Registered before "/v1" so the API-key scope wins
            .service(
                web::scope("/v1/public")
                    .wrap(rate_limiter.clone())
                    .wrap(ApiKeyAuth::new(api_key_service.clone()))
                    .configure(routes::configure_public_api_routes),
            )
            .service(
                web::scope("/v1")
                    .wrap(SecureAuthentication::new(jwt_keys.clone()))
                    .configure(routes::configure_dashboard_routes),
            )
            .service(web::scope("/internal").configure(routes::configure_internal_routes))
            .service(web::scope("/webhooks").configure(routes::configure_webhook_routes))
    })
    .listen(listener)?
    .run()
    .await
}
