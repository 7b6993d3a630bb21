use async_trait::async_trait;
use sqlx::{PgPool, query, query_as};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::project::{Asset, AssetKind, Project, ProjectStatus};

#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn find_by_id(&self, project_id: &Uuid) -> Result<Option<Project>, AppError>;

    async fn update_status(&self, project_id: &Uuid, status: ProjectStatus) -> Result<(), AppError>;

    /// Sets the status and, when given, the source URL in one statement.
    async fn mark_ingesting(&self, project_id: &Uuid, source_url: Option<&str>) -> Result<(), AppError>;
}

#[async_trait]
pub trait AssetStore: Send + Sync {
    async fn create_asset(
        &self,
        project_id: &Uuid,
        kind: AssetKind,
        url: &str,
        mime_type: Option<&str>,
    ) -> Result<Asset, AppError>;
}

pub struct ProjectRepository {
    db_pool: PgPool,
}

impl ProjectRepository {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl ProjectStore for ProjectRepository {
    async fn find_by_id(&self, project_id: &Uuid) -> Result<Option<Project>, AppError> {
        query_as::<_, Project>(
            r#"
            SELECT id, org_id, title, source_url, status, created_at, updated_at
            FROM projects
            WHERE id = $1
            "#,
        )
        .bind(project_id)
        .fetch_optional(&self.db_pool)
        .await
        .map_err(|e| AppError::Database(format!("Failed to fetch project: {}", e)))
    }

    async fn update_status(&self, project_id: &Uuid, status: ProjectStatus) -> Result<(), AppError> {
        query("UPDATE projects SET status = $2, updated_at = now() WHERE id = $1")
            .bind(project_id)
            .bind(status.as_str())
            .execute(&self.db_pool)
            .await
            .map_err(|e| AppError::Database(format!("Failed to update project status: {}", e)))?;

        Ok(())
    }

    async fn mark_ingesting(&self, project_id: &Uuid, source_url: Option<&str>) -> Result<(), AppError> {
        query(
            r#"
            UPDATE projects
            SET status = $2,
                source_url = COALESCE($3, source_url),
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(project_id)
        .bind(ProjectStatus::Ingesting.as_str())
        .bind(source_url)
        .execute(&self.db_pool)
        .await
        .map_err(|e| AppError::Database(format!("Failed to update project: {}", e)))?;

        Ok(())
    }
}

pub struct AssetRepository {
    db_pool: PgPool,
}

impl AssetRepository {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl AssetStore for AssetRepository {
    async fn create_asset(
        &self,
        project_id: &Uuid,
        kind: AssetKind,
        url: &str,
        mime_type: Option<&str>,
    ) -> Result<Asset, AppError> {
        query_as::<_, Asset>(
            r#"
            INSERT INTO assets (id, project_id, kind, url, mime_type, created_at)
            VALUES ($1, $2, $3, $4, $5, now())
            RETURNING id, project_id, kind, url, mime_type, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(project_id)
        .bind(kind.as_str())
        .bind(url)
        .bind(mime_type)
        .fetch_one(&self.db_pool)
        .await
        .map_err(|e| AppError::Database(format!("Failed to create asset: {}", e)))
    }
}
