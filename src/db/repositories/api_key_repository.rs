use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, query, query_as, query_scalar};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::api_key::{ApiKey, TierLimits};

/// Fields required to persist a new key.
#[derive(Debug, Clone)]
pub struct NewApiKey {
    pub org_id: Uuid,
    pub user_id: Uuid,
    pub key_hash: String,
    pub name: String,
    pub limits: TierLimits,
    pub expires_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait ApiKeyStore: Send + Sync {
    async fn create_key(&self, new_key: NewApiKey) -> Result<ApiKey, AppError>;

    /// Keys that are not expired; revoked keys are deleted outright.
    async fn find_active_by_hash(&self, key_hash: &str) -> Result<Option<ApiKey>, AppError>;

    async fn touch_usage(&self, id: &Uuid) -> Result<(), AppError>;

    async fn list_for_org(&self, org_id: &Uuid) -> Result<Vec<ApiKey>, AppError>;

    async fn count_for_org(&self, org_id: &Uuid) -> Result<i64, AppError>;

    /// Returns false when no key with this id belongs to the org.
    async fn update_name(&self, id: &Uuid, org_id: &Uuid, name: &str) -> Result<bool, AppError>;

    /// Returns false when no key with this id belongs to the org.
    async fn delete_for_org(&self, id: &Uuid, org_id: &Uuid) -> Result<bool, AppError>;
}

pub struct ApiKeyRepository {
    db_pool: PgPool,
}

impl ApiKeyRepository {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }
}

const API_KEY_COLUMNS: &str = "id, org_id, user_id, key_hash, name, rate_limit, quota_minutes, quota_exports, last_used_at, expires_at, created_at";

#[async_trait]
impl ApiKeyStore for ApiKeyRepository {
    async fn create_key(&self, new_key: NewApiKey) -> Result<ApiKey, AppError> {
        let sql = format!(
            r#"
            INSERT INTO api_keys (id, org_id, user_id, key_hash, name, rate_limit, quota_minutes, quota_exports, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, now())
            RETURNING {}
            "#,
            API_KEY_COLUMNS
        );

        query_as::<_, ApiKey>(&sql)
            .bind(Uuid::new_v4())
            .bind(new_key.org_id)
            .bind(new_key.user_id)
            .bind(&new_key.key_hash)
            .bind(&new_key.name)
            .bind(new_key.limits.rate_limit)
            .bind(new_key.limits.quota_minutes)
            .bind(new_key.limits.quota_exports)
            .bind(new_key.expires_at)
            .fetch_one(&self.db_pool)
            .await
            .map_err(|e| AppError::Database(format!("Failed to create API key: {}", e)))
    }

    async fn find_active_by_hash(&self, key_hash: &str) -> Result<Option<ApiKey>, AppError> {
        let sql = format!(
            r#"
            SELECT {}
            FROM api_keys
            WHERE key_hash = $1
              AND (expires_at IS NULL OR expires_at > now())
            "#,
            API_KEY_COLUMNS
        );

        query_as::<_, ApiKey>(&sql)
            .bind(key_hash)
            .fetch_optional(&self.db_pool)
            .await
            .map_err(|e| {
                log::error!("Database error finding API key: {}", e);
                AppError::Database(format!("Failed to fetch API key: {}", e))
            })
    }

    async fn touch_usage(&self, id: &Uuid) -> Result<(), AppError> {
        query("UPDATE api_keys SET last_used_at = now() WHERE id = $1")
            .bind(id)
            .execute(&self.db_pool)
            .await
            .map_err(|e| AppError::Database(format!("Failed to update API key usage: {}", e)))?;

        Ok(())
    }

    async fn list_for_org(&self, org_id: &Uuid) -> Result<Vec<ApiKey>, AppError> {
        let sql = format!(
            "SELECT {} FROM api_keys WHERE org_id = $1 ORDER BY created_at DESC",
            API_KEY_COLUMNS
        );

        query_as::<_, ApiKey>(&sql)
            .bind(org_id)
            .fetch_all(&self.db_pool)
            .await
            .map_err(|e| AppError::Database(format!("Failed to list API keys: {}", e)))
    }

    async fn count_for_org(&self, org_id: &Uuid) -> Result<i64, AppError> {
        query_scalar::<_, i64>("SELECT COUNT(*) FROM api_keys WHERE org_id = $1")
            .bind(org_id)
            .fetch_one(&self.db_pool)
            .await
            .map_err(|e| AppError::Database(format!("Failed to count API keys: {}", e)))
    }

    async fn update_name(&self, id: &Uuid, org_id: &Uuid, name: &str) -> Result<bool, AppError> {
        let result = query("UPDATE api_keys SET name = $3 WHERE id = $1 AND org_id = $2")
            .bind(id)
            .bind(org_id)
            .bind(name)
            .execute(&self.db_pool)
            .await
            .map_err(|e| AppError::Database(format!("Failed to update API key: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_for_org(&self, id: &Uuid, org_id: &Uuid) -> Result<bool, AppError> {
        let result = query("DELETE FROM api_keys WHERE id = $1 AND org_id = $2")
            .bind(id)
            .bind(org_id)
            .execute(&self.db_pool)
            .await
            .map_err(|e| AppError::Database(format!("Failed to revoke API key: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }
}
