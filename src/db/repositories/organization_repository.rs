use async_trait::async_trait;
use sqlx::{PgPool, query_as, query_scalar};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::organization::Organization;

#[async_trait]
pub trait OrganizationStore: Send + Sync {
    async fn find_by_id(&self, org_id: &Uuid) -> Result<Option<Organization>, AppError>;

    /// The organization of the user's oldest membership.
    async fn primary_org_for_user(&self, user_id: &Uuid) -> Result<Option<Uuid>, AppError>;
}

pub struct OrganizationRepository {
    db_pool: PgPool,
}

impl OrganizationRepository {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl OrganizationStore for OrganizationRepository {
    async fn find_by_id(&self, org_id: &Uuid) -> Result<Option<Organization>, AppError> {
        query_as::<_, Organization>(
            "SELECT id, name, tier, created_at FROM organizations WHERE id = $1",
        )
        .bind(org_id)
        .fetch_optional(&self.db_pool)
        .await
        .map_err(|e| AppError::Database(format!("Failed to fetch organization: {}", e)))
    }

    async fn primary_org_for_user(&self, user_id: &Uuid) -> Result<Option<Uuid>, AppError> {
        query_scalar::<_, Uuid>(
            r#"
            SELECT org_id
            FROM memberships
            WHERE user_id = $1
            ORDER BY created_at ASC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.db_pool)
        .await
        .map_err(|e| AppError::Database(format!("Failed to fetch membership: {}", e)))
    }
}
