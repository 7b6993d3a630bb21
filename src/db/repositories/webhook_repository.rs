use async_trait::async_trait;
use sqlx::{PgPool, query, query_as};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::webhook::Webhook;

#[async_trait]
pub trait WebhookStore: Send + Sync {
    async fn create(
        &self,
        org_id: &Uuid,
        user_id: &Uuid,
        url: &str,
        secret: &str,
        events: &[String],
    ) -> Result<Webhook, AppError>;

    async fn list_for_org(&self, org_id: &Uuid) -> Result<Vec<Webhook>, AppError>;

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Webhook>, AppError>;

    async fn delete(&self, id: &Uuid) -> Result<(), AppError>;

    async fn update_secret(&self, id: &Uuid, secret: &str) -> Result<(), AppError>;
}

pub struct WebhookRepository {
    db_pool: PgPool,
}

impl WebhookRepository {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }
}

const WEBHOOK_COLUMNS: &str = "id, org_id, user_id, url, secret, events, active, created_at";

#[async_trait]
impl WebhookStore for WebhookRepository {
    async fn create(
        &self,
        org_id: &Uuid,
        user_id: &Uuid,
        url: &str,
        secret: &str,
        events: &[String],
    ) -> Result<Webhook, AppError> {
        let sql = format!(
            r#"
            INSERT INTO webhooks (id, org_id, user_id, url, secret, events, active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, TRUE, now())
            RETURNING {}
            "#,
            WEBHOOK_COLUMNS
        );

        query_as::<_, Webhook>(&sql)
            .bind(Uuid::new_v4())
            .bind(org_id)
            .bind(user_id)
            .bind(url)
            .bind(secret)
            .bind(events)
            .fetch_one(&self.db_pool)
            .await
            .map_err(|e| AppError::Database(format!("Failed to create webhook: {}", e)))
    }

    async fn list_for_org(&self, org_id: &Uuid) -> Result<Vec<Webhook>, AppError> {
        let sql = format!(
            "SELECT {} FROM webhooks WHERE org_id = $1 ORDER BY created_at DESC",
            WEBHOOK_COLUMNS
        );

        query_as::<_, Webhook>(&sql)
            .bind(org_id)
            .fetch_all(&self.db_pool)
            .await
            .map_err(|e| AppError::Database(format!("Failed to list webhooks: {}", e)))
    }

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Webhook>, AppError> {
        let sql = format!("SELECT {} FROM webhooks WHERE id = $1", WEBHOOK_COLUMNS);

        query_as::<_, Webhook>(&sql)
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await
            .map_err(|e| AppError::Database(format!("Failed to fetch webhook: {}", e)))
    }

    async fn delete(&self, id: &Uuid) -> Result<(), AppError> {
        query("DELETE FROM webhooks WHERE id = $1")
            .bind(id)
            .execute(&self.db_pool)
            .await
            .map_err(|e| AppError::Database(format!("Failed to delete webhook: {}", e)))?;

        Ok(())
    }

    async fn update_secret(&self, id: &Uuid, secret: &str) -> Result<(), AppError> {
        query("UPDATE webhooks SET secret = $2 WHERE id = $1")
            .bind(id)
            .bind(secret)
            .execute(&self.db_pool)
            .await
            .map_err(|e| AppError::Database(format!("Failed to rotate webhook secret: {}", e)))?;

        Ok(())
    }
}
