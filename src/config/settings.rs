use std::env;
use crate::clients::assemblyai_client::DEFAULT_ASSEMBLYAI_BASE_URL;
use crate::error::AppError;
use serde::{Deserialize, Serialize};

/// Fallback secret accepted only in development.
pub const DEV_JWT_SECRET: &str = "dev-secret-change-in-production";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppSettings {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub rate_limit: RateLimitConfig,
    pub storage: StorageConfig,
    pub assemblyai: AssemblyAiConfig,
    pub proxy: ProxyConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    pub name: String,
    pub environment: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    /// Public base URL used when handing out proxy and webhook URLs.
    pub api_base_url: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub api_key_hash_secret: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub window_ms: u64,
    pub cleanup_interval_secs: u64,
    pub redis_url: Option<String>,
    pub redis_key_prefix: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    S3,
    Local,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub bucket: String,
    pub endpoint: Option<String>,
    pub region: String,
    pub local_root: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AssemblyAiConfig {
    pub api_key: Option<String>,
    pub webhook_secret: Option<String>,
    pub base_url: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProxyConfig {
    pub token_lifetime_secs: i64,
}

impl AppSettings {
    pub fn is_development(&self) -> bool {
        self.app.environment == "development"
    }

    pub fn from_env() -> Result<Self, AppError> {
        // App config
        let app_name = env::var("APP_NAME").unwrap_or_else(|_| "clipforge-api".to_string());
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        // Database config
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| AppError::Configuration("DATABASE_URL must be set".to_string()))?;

        // Server config
        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .map_err(|_| AppError::Configuration("SERVER_PORT must be a valid port number".to_string()))?;

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let api_base_url = env::var("API_BASE_URL")
            .unwrap_or_else(|_| format!("http://{}:{}", server_host, server_port))
            .trim_end_matches('/')
            .to_string();

        // Auth config
        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) => secret,
            Err(_) if environment == "development" => {
                log::warn!("Using default JWT secret - set JWT_SECRET in production!");
                DEV_JWT_SECRET.to_string()
            }
            Err(_) => {
                return Err(AppError::Configuration("JWT_SECRET must be set".to_string()));
            }
        };

        if environment != "development" && jwt_secret.len() < 32 {
            return Err(AppError::Configuration(
                "JWT_SECRET must be at least 32 characters long".to_string(),
            ));
        }

        let api_key_hash_secret = env::var("API_KEY_HASH_SECRET").unwrap_or_else(|_| jwt_secret.clone());

        // Rate limiting
        let rate_limit_window_ms = env::var("RATE_LIMIT_WINDOW_MS")
            .unwrap_or_else(|_| "60000".to_string())
            .parse::<u64>()
            .map_err(|_| AppError::Configuration("RATE_LIMIT_WINDOW_MS must be a valid number".to_string()))?;

        if rate_limit_window_ms == 0 {
            return Err(AppError::Configuration("RATE_LIMIT_WINDOW_MS must be greater than zero".to_string()));
        }

        let cleanup_interval_secs = env::var("RATE_LIMIT_CLEANUP_INTERVAL_SECS")
            .unwrap_or_else(|_| "60".to_string())
            .parse::<u64>()
            .map_err(|_| AppError::Configuration("RATE_LIMIT_CLEANUP_INTERVAL_SECS must be a valid number".to_string()))?;

        let redis_url = non_empty_var("REDIS_URL");
        let redis_key_prefix = non_empty_var("RATE_LIMIT_REDIS_PREFIX");

        // Storage
        let backend = match env::var("STORAGE_BACKEND").unwrap_or_else(|_| "s3".to_string()).to_lowercase().as_str() {
            "s3" | "minio" => StorageBackend::S3,
            "local" => StorageBackend::Local,
            other => {
                return Err(AppError::Configuration(format!(
                    "STORAGE_BACKEND must be 's3' or 'local', got '{}'",
                    other
                )));
            }
        };
        let bucket = env::var("STORAGE_BUCKET").unwrap_or_else(|_| "clipforge".to_string());
        let endpoint = non_empty_var("STORAGE_ENDPOINT");
        let region = env::var("STORAGE_REGION").unwrap_or_else(|_| "us-east-1".to_string());
        let local_root = env::var("STORAGE_LOCAL_ROOT").unwrap_or_else(|_| "./media".to_string());

        // AssemblyAI
        let assemblyai_api_key = non_empty_var("ASSEMBLYAI_API_KEY").filter(|k| !k.contains("your-"));
        let assemblyai_webhook_secret = non_empty_var("ASSEMBLYAI_WEBHOOK_SECRET");
        let assemblyai_base_url = env::var("ASSEMBLYAI_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_ASSEMBLYAI_BASE_URL.to_string());

        let token_lifetime_secs = env::var("PROXY_TOKEN_LIFETIME_SECS")
            .unwrap_or_else(|_| "900".to_string())
            .parse::<i64>()
            .map_err(|_| AppError::Configuration("PROXY_TOKEN_LIFETIME_SECS must be a valid number".to_string()))?;

        Ok(Self {
            app: AppConfig {
                name: app_name,
                environment,
            },
            database: DatabaseConfig {
                url: database_url,
            },
            server: ServerConfig {
                host: server_host,
                port: server_port,
                cors_origins,
                api_base_url,
            },
            auth: AuthConfig {
                jwt_secret,
                api_key_hash_secret,
            },
            rate_limit: RateLimitConfig {
                window_ms: rate_limit_window_ms,
                cleanup_interval_secs,
                redis_url,
                redis_key_prefix,
            },
            storage: StorageConfig {
                backend,
                bucket,
                endpoint,
                region,
                local_root,
            },
            assemblyai: AssemblyAiConfig {
                api_key: assemblyai_api_key,
                webhook_secret: assemblyai_webhook_secret,
                base_url: assemblyai_base_url,
            },
            proxy: ProxyConfig {
                token_lifetime_secs,
            },
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[cfg(test)]
impl AppSettings {
    /// Settings for tests, independent of the process environment.
    pub fn for_tests() -> Self {
        Self {
            app: AppConfig {
                name: "clipforge-api".to_string(),
                environment: "test".to_string(),
            },
            database: DatabaseConfig {
                url: "postgres://localhost/clipforge_test".to_string(),
            },
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                cors_origins: vec!["*".to_string()],
                api_base_url: "http://localhost:8080".to_string(),
            },
            auth: AuthConfig {
                jwt_secret: "test-secret-that-is-long-enough-for-hs256".to_string(),
                api_key_hash_secret: "test-api-key-hash-secret".to_string(),
            },
            rate_limit: RateLimitConfig {
                window_ms: 60_000,
                cleanup_interval_secs: 60,
                redis_url: None,
                redis_key_prefix: None,
            },
            storage: StorageConfig {
                backend: StorageBackend::Local,
                bucket: "clipforge".to_string(),
                endpoint: None,
                region: "us-east-1".to_string(),
                local_root: "./media".to_string(),
            },
            assemblyai: AssemblyAiConfig {
                api_key: None,
                webhook_secret: None,
                base_url: DEFAULT_ASSEMBLYAI_BASE_URL.to_string(),
            },
            proxy: ProxyConfig {
                token_lifetime_secs: 900,
            },
        }
    }
}
