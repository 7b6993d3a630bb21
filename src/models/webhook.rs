use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Events a webhook subscribes to when the caller does not choose any.
pub const DEFAULT_WEBHOOK_EVENTS: [&str; 2] = ["job.completed", "export.ready"];

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Webhook {
    pub id: Uuid,
    pub org_id: Uuid,
    pub user_id: Uuid,
    pub url: String,
    /// Used to sign outbound payloads
    pub secret: String,
    pub events: Vec<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWebhookRequest {
    pub url: String,
    #[serde(default)]
    pub events: Option<Vec<String>>,
}
