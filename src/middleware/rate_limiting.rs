use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    http::{
        Method,
        header::{self, HeaderName, HeaderValue},
    },
};
use dashmap::DashMap;
use futures_util::future::{Ready, ok};
use log::{debug, error, info, warn};
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use uuid::Uuid;

use crate::config::settings::RateLimitConfig;
use crate::error::AppError;
use crate::middleware::auth_types::ApiKeyIdentity;

const X_RATELIMIT_LIMIT: &str = "x-ratelimit-limit";
const X_RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";
const X_RATELIMIT_RESET: &str = "x-ratelimit-reset";

/// Request counter for one key within one fixed window
#[derive(Debug, Clone)]
pub struct WindowCounter {
    count: i64,
    /// Epoch millis at which the window closes
    reset_at: i64,
}

/// Outcome of a rate limit check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: i64,
    pub remaining: i64,
    /// Epoch millis at which the current window closes
    pub reset_at: i64,
}

impl RateLimitDecision {
    /// Whole seconds until the window closes, rounded up.
    pub fn retry_after_secs(&self, now_ms: i64) -> i64 {
        let remaining_ms = (self.reset_at - now_ms).max(0);
        (remaining_ms + 999) / 1000
    }
}

/// Start of the fixed window containing `now_ms`.
pub fn window_start(now_ms: i64, window_ms: i64) -> i64 {
    now_ms - now_ms.rem_euclid(window_ms)
}

/// Storage backend for rate limiting
#[derive(Clone)]
pub enum RateLimitStorage {
    /// In-memory storage using DashMap (single instance)
    Memory {
        windows: Arc<DashMap<String, WindowCounter>>,
    },
    /// Redis-based storage (shared across instances)
    Redis {
        connection_manager: Arc<redis::aio::ConnectionManager>,
        key_prefix: String,
    },
}

impl RateLimitStorage {
    /// Create a new in-memory storage
    pub fn new_memory() -> Self {
        Self::Memory {
            windows: Arc::new(DashMap::new()),
        }
    }

    /// Create a new Redis-based storage
    pub async fn new_redis(redis_url: &str, key_prefix: Option<String>) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(redis_url)?;
        let connection_manager = redis::aio::ConnectionManager::new(client).await?;

        info!("Redis connection established for rate limiting");

        Ok(Self::Redis {
            connection_manager: Arc::new(connection_manager),
            key_prefix: key_prefix.unwrap_or_else(|| "clipforge".to_string()),
        })
    }

    /// Counts one request for `api_key_id` in the window containing `now_ms`.
    ///
    /// A denied request does not consume quota in the memory store.
    pub async fn check_and_increment(
        &self,
        api_key_id: &Uuid,
        limit: i64,
        window_ms: i64,
        now_ms: i64,
    ) -> RateLimitDecision {
        let start = window_start(now_ms, window_ms);
        let reset_at = start + window_ms;
        let key = format!("{}:{}", api_key_id, start);

        match self {
            RateLimitStorage::Memory { windows } => {
                Self::check_memory(windows, key, limit, reset_at, now_ms)
            }
            RateLimitStorage::Redis {
                connection_manager,
                key_prefix,
            } => {
                let redis_key = format!("rate_limit:{}:api_key:{}", key_prefix, key);
                match Self::check_redis(connection_manager, &redis_key, limit, reset_at).await {
                    Ok(decision) => decision,
                    Err(e) => {
                        error!("Redis rate limit check failed for key {}: {}", api_key_id, e);
                        RateLimitDecision {
                            allowed: false,
                            limit,
                            remaining: 0,
                            reset_at,
                        }
                    }
                }
            }
        }
    }

    fn check_memory(
        windows: &DashMap<String, WindowCounter>,
        key: String,
        limit: i64,
        reset_at: i64,
        now_ms: i64,
    ) -> RateLimitDecision {
        let mut counter = windows
            .entry(key)
            .or_insert_with(|| WindowCounter { count: 0, reset_at });

        if counter.reset_at <= now_ms {
            counter.count = 0;
            counter.reset_at = reset_at;
        }

        if counter.count >= limit {
            return RateLimitDecision {
                allowed: false,
                limit,
                remaining: 0,
                reset_at: counter.reset_at,
            };
        }

        counter.count += 1;
        RateLimitDecision {
            allowed: true,
            limit,
            remaining: limit - counter.count,
            reset_at: counter.reset_at,
        }
    }

    async fn check_redis(
        connection_manager: &Arc<redis::aio::ConnectionManager>,
        key: &str,
        limit: i64,
        reset_at: i64,
    ) -> Result<RateLimitDecision, redis::RedisError> {
        use redis::AsyncCommands;

        let mut conn = connection_manager.as_ref().clone();

        let count: i64 = conn.incr(key, 1).await?;

        if count == 1 {
            // Set expiration only on first increment
            let _: () = redis::cmd("PEXPIREAT")
                .arg(key)
                .arg(reset_at)
                .query_async(&mut conn)
                .await?;
        }

        Ok(RateLimitDecision {
            allowed: count <= limit,
            limit,
            remaining: (limit - count).max(0),
            reset_at,
        })
    }

    /// Drops memory windows whose reset time has passed. Redis expires keys itself.
    pub fn cleanup_expired(&self, now_ms: i64) -> usize {
        match self {
            RateLimitStorage::Memory { windows } => {
                let before = windows.len();
                windows.retain(|_, counter| counter.reset_at > now_ms);
                before - windows.len()
            }
            RateLimitStorage::Redis { .. } => 0,
        }
    }

    pub fn is_memory(&self) -> bool {
        matches!(self, RateLimitStorage::Memory { .. })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RateLimitInfo {
    limit: i64,
    remaining: i64,
    reset: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RateLimitExceededBody {
    status_code: u16,
    message: String,
    rate_limit: RateLimitInfo,
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Per-API-key fixed window limiter.
///
/// Must run after `ApiKeyAuth`; requests without an `ApiKeyIdentity` pass through.
#[derive(Clone)]
pub struct RateLimitMiddleware {
    storage: RateLimitStorage,
    window_ms: i64,
    clock: fn() -> i64,
}

impl RateLimitMiddleware {
    pub fn new(config: &RateLimitConfig, storage: RateLimitStorage) -> Self {
        Self {
            storage,
            window_ms: (config.window_ms as i64).max(1),
            clock: now_millis,
        }
    }

    #[cfg(test)]
    fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    fn exceeded_response(decision: &RateLimitDecision, now_ms: i64) -> HttpResponse {
        let retry_after = decision.retry_after_secs(now_ms);
        let body = RateLimitExceededBody {
            status_code: 429,
            message: format!("Rate limit exceeded. Try again in {} seconds.", retry_after),
            rate_limit: RateLimitInfo {
                limit: decision.limit,
                remaining: 0,
                reset: decision.reset_at,
            },
        };

        HttpResponse::TooManyRequests()
            .insert_header((X_RATELIMIT_LIMIT, decision.limit))
            .insert_header((X_RATELIMIT_REMAINING, 0))
            .insert_header((X_RATELIMIT_RESET, decision.reset_at))
            .insert_header((header::RETRY_AFTER, retry_after))
            .json(body)
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimitMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = RateLimitService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(RateLimitService {
            service: Rc::new(service),
            middleware: self.clone(),
        })
    }
}

pub struct RateLimitService<S> {
    service: Rc<S>,
    middleware: RateLimitMiddleware,
}

impl<S, B> Service<ServiceRequest> for RateLimitService<S>
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
        let middleware = self.middleware.clone();

        Box::pin(async move {
            // Skip rate limiting for OPTIONS requests (CORS preflight)
            if req.method() == Method::OPTIONS {
                return service.call(req).await.map(ServiceResponse::map_into_left_body);
            }

            let identity = req.extensions().get::<ApiKeyIdentity>().cloned();
            let Some(identity) = identity else {
                return service.call(req).await.map(ServiceResponse::map_into_left_body);
            };

            let now_ms = (middleware.clock)();
            let decision = middleware
                .storage
                .check_and_increment(
                    &identity.api_key_id,
                    identity.rate_limit as i64,
                    middleware.window_ms,
                    now_ms,
                )
                .await;

            if !decision.allowed {
                warn!(
                    "Rate limit exceeded for API key {} on {} (limit {})",
                    identity.api_key_id,
                    req.path(),
                    decision.limit
                );
                let response = RateLimitMiddleware::exceeded_response(&decision, now_ms);
                return Ok(req.into_response(response).map_into_right_body());
            }

            debug!(
                "Rate limit passed for API key {} ({} remaining)",
                identity.api_key_id, decision.remaining
            );

            let mut res = service.call(req).await?;
            let headers = res.headers_mut();
            headers.insert(HeaderName::from_static(X_RATELIMIT_LIMIT), HeaderValue::from(decision.limit));
            headers.insert(HeaderName::from_static(X_RATELIMIT_REMAINING), HeaderValue::from(decision.remaining));
            headers.insert(HeaderName::from_static(X_RATELIMIT_RESET), HeaderValue::from(decision.reset_at));

            Ok(res.map_into_left_body())
        })
    }
}

/// Initialize rate limiting storage based on configuration
pub async fn create_rate_limit_storage(config: &RateLimitConfig) -> Result<RateLimitStorage, AppError> {
    match &config.redis_url {
        Some(url) => match RateLimitStorage::new_redis(url, config.redis_key_prefix.clone()).await {
            Ok(storage) => {
                info!("Redis connected for rate limiting");
                Ok(storage)
            }
            Err(e) => {
                error!("Failed to connect to Redis for rate limiting: {}", e);
                Err(AppError::Configuration(format!(
                    "Failed to connect to Redis for rate limiting: {}",
                    e
                )))
            }
        },
        None => {
            info!("REDIS_URL not set, using in-memory rate limiting (single instance only)");
            Ok(RateLimitStorage::new_memory())
        }
    }
}

/// Start a background task for cleaning up expired rate limit entries from memory stores
pub async fn start_memory_store_cleanup_task(storage: RateLimitStorage, cleanup_interval_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(cleanup_interval_secs.max(1)));
    info!(
        "Starting rate limit memory store cleanup task (interval: {}s)",
        cleanup_interval_secs
    );

    loop {
        interval.tick().await;
        let removed = storage.cleanup_expired(now_millis());
        debug!("Rate limit memory cleanup removed {} expired windows", removed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::{App, test, web};
    use proptest::prelude::*;

    const WINDOW_MS: i64 = 60_000;
    // 2025-01-01T00:00:30Z, mid-window
    const FIXED_NOW: i64 = 1_735_689_630_000;

    fn fixed_clock() -> i64 {
        FIXED_NOW
    }

    fn config() -> RateLimitConfig {
        let mut config = crate::config::AppSettings::for_tests().rate_limit;
        config.window_ms = WINDOW_MS as u64;
        config
    }

    fn identity(rate_limit: i32) -> ApiKeyIdentity {
        ApiKeyIdentity {
            api_key_id: Uuid::new_v4(),
            org_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            rate_limit,
            name: "test".to_string(),
        }
    }

    #[tokio::test]
    async fn test_memory_window_allows_up_to_limit() {
        let storage = RateLimitStorage::new_memory();
        let key = Uuid::new_v4();

        for i in 1..=10 {
            let d = storage.check_and_increment(&key, 10, WINDOW_MS, FIXED_NOW).await;
            assert!(d.allowed);
            assert_eq!(d.remaining, 10 - i);
            assert_eq!(d.reset_at, 1_735_689_660_000);
        }

        let denied = storage.check_and_increment(&key, 10, WINDOW_MS, FIXED_NOW + 5).await;
        assert!(!denied.allowed);
        assert_eq!(denied.remaining, 0);
        assert_eq!(denied.retry_after_secs(FIXED_NOW + 5), 30);

        let next_window = storage
            .check_and_increment(&key, 10, WINDOW_MS, FIXED_NOW + 30_000)
            .await;
        assert!(next_window.allowed);
        assert_eq!(next_window.remaining, 9);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let storage = RateLimitStorage::new_memory();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        assert!(storage.check_and_increment(&a, 1, WINDOW_MS, FIXED_NOW).await.allowed);
        assert!(!storage.check_and_increment(&a, 1, WINDOW_MS, FIXED_NOW).await.allowed);
        assert!(storage.check_and_increment(&b, 1, WINDOW_MS, FIXED_NOW).await.allowed);
    }

    #[tokio::test]
    async fn test_cleanup_removes_closed_windows() {
        let storage = RateLimitStorage::new_memory();
        storage.check_and_increment(&Uuid::new_v4(), 5, WINDOW_MS, FIXED_NOW).await;
        storage
            .check_and_increment(&Uuid::new_v4(), 5, WINDOW_MS, FIXED_NOW + WINDOW_MS)
            .await;

        assert_eq!(storage.cleanup_expired(FIXED_NOW + 30_000), 1);
        assert_eq!(storage.cleanup_expired(FIXED_NOW + 30_000), 0);
    }

    #[actix_rt::test]
    async fn test_middleware_rejects_eleventh_request() {
        let id = identity(10);
        let app = test::init_service(
            App::new()
                .wrap(RateLimitMiddleware::new(&config(), RateLimitStorage::new_memory()).with_clock(fixed_clock))
                .wrap_fn(move |req, srv| {
                    req.extensions_mut().insert(id.clone());
                    srv.call(req)
                })
                .route("/v1/public/me", web::get().to(|| async { HttpResponse::Ok().finish() })),
        )
        .await;

        for i in 1..=10 {
            let resp = test::call_service(&app, test::TestRequest::get().uri("/v1/public/me").to_request()).await;
            assert_eq!(resp.status(), StatusCode::OK);
            assert_eq!(resp.headers().get("x-ratelimit-limit").unwrap(), "10");
            assert_eq!(
                resp.headers().get("x-ratelimit-remaining").unwrap(),
                (10 - i).to_string().as_str()
            );
        }

        let resp = test::call_service(&app, test::TestRequest::get().uri("/v1/public/me").to_request()).await;
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(resp.headers().get("x-ratelimit-remaining").unwrap(), "0");
        assert_eq!(resp.headers().get(header::RETRY_AFTER).unwrap(), "30");

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["statusCode"], 429);
        assert_eq!(body["message"], "Rate limit exceeded. Try again in 30 seconds.");
        assert_eq!(body["rateLimit"]["limit"], 10);
        assert_eq!(body["rateLimit"]["remaining"], 0);
        assert_eq!(body["rateLimit"]["reset"], 1_735_689_660_000i64);
    }

    #[actix_rt::test]
    async fn test_requests_without_identity_pass() {
        let app = test::init_service(
            App::new()
                .wrap(RateLimitMiddleware::new(&config(), RateLimitStorage::new_memory()))
                .route("/health", web::get().to(|| async { HttpResponse::Ok().finish() })),
        )
        .await;

        for _ in 0..50 {
            let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
            assert_eq!(resp.status(), StatusCode::OK);
            assert!(resp.headers().get("x-ratelimit-limit").is_none());
        }
    }

    proptest! {
        #[::core::prelude::v1::test]
        fn prop_window_start_aligned(now in 0i64..4_000_000_000_000, window in 1i64..3_600_000) {
            let start = window_start(now, window);
            prop_assert_eq!(start % window, 0);
            prop_assert!(start <= now);
            prop_assert!(now < start + window);
        }
    }
}
