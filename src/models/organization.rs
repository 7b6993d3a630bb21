use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::api_key::Tier;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub tier: String,
    pub created_at: DateTime<Utc>,
}

impl Organization {
    pub fn tier(&self) -> Tier {
        Tier::from_db(&self.tier)
    }
}
