use async_trait::async_trait;
use sqlx::{PgPool, query, query_as};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::transcript::{Transcript, TranscriptStatus};

#[async_trait]
pub trait TranscriptStore: Send + Sync {
    /// Creates the project's transcript, or resets an existing one back to PENDING.
    async fn upsert_pending(&self, project_id: &Uuid) -> Result<Transcript, AppError>;

    async fn mark_processing(&self, id: &Uuid, external_id: &str) -> Result<(), AppError>;

    async fn mark_completed(&self, id: &Uuid, language: &str, data: serde_json::Value) -> Result<(), AppError>;

    async fn mark_failed(&self, id: &Uuid, data: serde_json::Value) -> Result<(), AppError>;

    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<Transcript>, AppError>;
}

pub struct TranscriptRepository {
    db_pool: PgPool,
}

impl TranscriptRepository {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }
}

const TRANSCRIPT_COLUMNS: &str = "id, project_id, external_id, status, language, data, completed_at, created_at";

#[async_trait]
impl TranscriptStore for TranscriptRepository {
    async fn upsert_pending(&self, project_id: &Uuid) -> Result<Transcript, AppError> {
        let sql = format!(
            r#"
            INSERT INTO transcripts (id, project_id, status, created_at)
            VALUES ($1, $2, $3, now())
            ON CONFLICT (project_id) DO UPDATE
            SET status = EXCLUDED.status,
                external_id = NULL,
                data = NULL,
                completed_at = NULL
            RETURNING {}
            "#,
            TRANSCRIPT_COLUMNS
        );

        query_as::<_, Transcript>(&sql)
            .bind(Uuid::new_v4())
            .bind(project_id)
            .bind(TranscriptStatus::Pending.as_str())
            .fetch_one(&self.db_pool)
            .await
            .map_err(|e| AppError::Database(format!("Failed to create transcript: {}", e)))
    }

    async fn mark_processing(&self, id: &Uuid, external_id: &str) -> Result<(), AppError> {
        query("UPDATE transcripts SET status = $2, external_id = $3 WHERE id = $1")
            .bind(id)
            .bind(TranscriptStatus::Processing.as_str())
            .bind(external_id)
            .execute(&self.db_pool)
            .await
            .map_err(|e| AppError::Database(format!("Failed to update transcript: {}", e)))?;

        Ok(())
    }

    async fn mark_completed(&self, id: &Uuid, language: &str, data: serde_json::Value) -> Result<(), AppError> {
        query(
            r#"
            UPDATE transcripts
            SET status = $2, language = $3, data = $4, completed_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(TranscriptStatus::Completed.as_str())
        .bind(language)
        .bind(data)
        .execute(&self.db_pool)
        .await
        .map_err(|e| AppError::Database(format!("Failed to complete transcript: {}", e)))?;

        Ok(())
    }

    async fn mark_failed(&self, id: &Uuid, data: serde_json::Value) -> Result<(), AppError> {
        query("UPDATE transcripts SET status = $2, data = $3 WHERE id = $1")
            .bind(id)
            .bind(TranscriptStatus::Failed.as_str())
            .bind(data)
            .execute(&self.db_pool)
            .await
            .map_err(|e| AppError::Database(format!("Failed to mark transcript failed: {}", e)))?;

        Ok(())
    }

    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<Transcript>, AppError> {
        let sql = format!("SELECT {} FROM transcripts WHERE external_id = $1", TRANSCRIPT_COLUMNS);

        query_as::<_, Transcript>(&sql)
            .bind(external_id)
            .fetch_optional(&self.db_pool)
            .await
            .map_err(|e| AppError::Database(format!("Failed to fetch transcript: {}", e)))
    }
}
