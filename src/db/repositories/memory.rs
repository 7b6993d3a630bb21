//! In-memory implementations of the store traits, used by tests.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use crate::db::repositories::{
    ApiKeyStore, AssetStore, NewApiKey, OrganizationStore, ProjectStore, TranscriptStore, WebhookStore,
};
use crate::error::AppError;
use crate::models::api_key::{ApiKey, Tier};
use crate::models::organization::Organization;
use crate::models::project::{Asset, AssetKind, Project, ProjectStatus};
use crate::models::transcript::{Transcript, TranscriptStatus};
use crate::models::webhook::Webhook;

#[derive(Default)]
pub struct InMemoryStore {
    pub organizations: DashMap<Uuid, Organization>,
    pub memberships: DashMap<Uuid, Uuid>,
    pub api_keys: DashMap<Uuid, ApiKey>,
    pub webhooks: DashMap<Uuid, Webhook>,
    pub projects: DashMap<Uuid, Project>,
    pub assets: DashMap<Uuid, Asset>,
    pub transcripts: DashMap<Uuid, Transcript>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_org(&self, tier: Tier) -> Uuid {
        let id = Uuid::new_v4();
        self.organizations.insert(
            id,
            Organization {
                id,
                name: format!("org-{}", id),
                tier: tier.as_str().to_string(),
                created_at: Utc::now(),
            },
        );
        id
    }

    pub fn add_member(&self, user_id: Uuid, org_id: Uuid) {
        self.memberships.insert(user_id, org_id);
    }

    pub fn add_project(&self, org_id: Uuid, source_url: Option<&str>) -> Uuid {
        let id = Uuid::new_v4();
        let now = Utc::now();
        self.projects.insert(
            id,
            Project {
                id,
                org_id,
                title: "Test project".to_string(),
                source_url: source_url.map(str::to_string),
                status: ProjectStatus::Pending.as_str().to_string(),
                created_at: now,
                updated_at: now,
            },
        );
        id
    }

    pub fn project(&self, id: &Uuid) -> Option<Project> {
        self.projects.get(id).map(|p| p.clone())
    }

    pub fn transcript_for_project(&self, project_id: &Uuid) -> Option<Transcript> {
        self.transcripts
            .iter()
            .find(|t| &t.project_id == project_id)
            .map(|t| t.clone())
    }

    fn update_transcript<F: FnOnce(&mut Transcript)>(&self, id: &Uuid, f: F) -> Result<(), AppError> {
        match self.transcripts.get_mut(id) {
            Some(mut t) => {
                f(&mut t);
                Ok(())
            }
            None => Err(AppError::NotFound(format!("Transcript {}", id))),
        }
    }
}

#[async_trait]
impl ApiKeyStore for InMemoryStore {
    async fn create_key(&self, new_key: NewApiKey) -> Result<ApiKey, AppError> {
        let key = ApiKey {
            id: Uuid::new_v4(),
            org_id: new_key.org_id,
            user_id: new_key.user_id,
            key_hash: new_key.key_hash,
            name: new_key.name,
            rate_limit: new_key.limits.rate_limit,
            quota_minutes: new_key.limits.quota_minutes,
            quota_exports: new_key.limits.quota_exports,
            last_used_at: None,
            expires_at: new_key.expires_at,
            created_at: Utc::now(),
        };
        self.api_keys.insert(key.id, key.clone());
        Ok(key)
    }

    async fn find_active_by_hash(&self, key_hash: &str) -> Result<Option<ApiKey>, AppError> {
        let now = Utc::now();
        Ok(self
            .api_keys
            .iter()
            .find(|k| k.key_hash == key_hash && !k.is_expired_at(now))
            .map(|k| k.clone()))
    }

    async fn touch_usage(&self, id: &Uuid) -> Result<(), AppError> {
        if let Some(mut key) = self.api_keys.get_mut(id) {
            key.last_used_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn list_for_org(&self, org_id: &Uuid) -> Result<Vec<ApiKey>, AppError> {
        let mut keys: Vec<ApiKey> = self
            .api_keys
            .iter()
            .filter(|k| &k.org_id == org_id)
            .map(|k| k.clone())
            .collect();
        keys.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(keys)
    }

    async fn count_for_org(&self, org_id: &Uuid) -> Result<i64, AppError> {
        Ok(self.api_keys.iter().filter(|k| &k.org_id == org_id).count() as i64)
    }

    async fn update_name(&self, id: &Uuid, org_id: &Uuid, name: &str) -> Result<bool, AppError> {
        match self.api_keys.get_mut(id) {
            Some(mut key) if &key.org_id == org_id => {
                key.name = name.to_string();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_for_org(&self, id: &Uuid, org_id: &Uuid) -> Result<bool, AppError> {
        Ok(self.api_keys.remove_if(id, |_, k| &k.org_id == org_id).is_some())
    }
}

#[async_trait]
impl OrganizationStore for InMemoryStore {
    async fn find_by_id(&self, org_id: &Uuid) -> Result<Option<Organization>, AppError> {
        Ok(self.organizations.get(org_id).map(|o| o.clone()))
    }

    async fn primary_org_for_user(&self, user_id: &Uuid) -> Result<Option<Uuid>, AppError> {
        Ok(self.memberships.get(user_id).map(|m| *m))
    }
}

#[async_trait]
impl ProjectStore for InMemoryStore {
    async fn find_by_id(&self, project_id: &Uuid) -> Result<Option<Project>, AppError> {
        Ok(self.project(project_id))
    }

    async fn update_status(&self, project_id: &Uuid, status: ProjectStatus) -> Result<(), AppError> {
        if let Some(mut p) = self.projects.get_mut(project_id) {
            p.status = status.as_str().to_string();
            p.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn mark_ingesting(&self, project_id: &Uuid, source_url: Option<&str>) -> Result<(), AppError> {
        if let Some(mut p) = self.projects.get_mut(project_id) {
            p.status = ProjectStatus::Ingesting.as_str().to_string();
            if let Some(url) = source_url {
                p.source_url = Some(url.to_string());
            }
            p.updated_at = Utc::now();
        }
        Ok(())
    }
}

#[async_trait]
impl AssetStore for InMemoryStore {
    async fn create_asset(
        &self,
        project_id: &Uuid,
        kind: AssetKind,
        url: &str,
        mime_type: Option<&str>,
    ) -> Result<Asset, AppError> {
        let asset = Asset {
            id: Uuid::new_v4(),
            project_id: *project_id,
            kind: kind.as_str().to_string(),
            url: url.to_string(),
            mime_type: mime_type.map(str::to_string),
            created_at: Utc::now(),
        };
        self.assets.insert(asset.id, asset.clone());
        Ok(asset)
    }
}

#[async_trait]
impl TranscriptStore for InMemoryStore {
    async fn upsert_pending(&self, project_id: &Uuid) -> Result<Transcript, AppError> {
        if let Some(existing) = self.transcript_for_project(project_id) {
            self.update_transcript(&existing.id, |t| {
                t.status = TranscriptStatus::Pending.as_str().to_string();
                t.external_id = None;
                t.data = None;
                t.completed_at = None;
            })?;
            return self
                .transcripts
                .get(&existing.id)
                .map(|t| t.clone())
                .ok_or_else(|| AppError::Internal("transcript vanished".to_string()));
        }

        let transcript = Transcript {
            id: Uuid::new_v4(),
            project_id: *project_id,
            external_id: None,
            status: TranscriptStatus::Pending.as_str().to_string(),
            language: "en".to_string(),
            data: None,
            completed_at: None,
            created_at: Utc::now(),
        };
        self.transcripts.insert(transcript.id, transcript.clone());
        Ok(transcript)
    }

    async fn mark_processing(&self, id: &Uuid, external_id: &str) -> Result<(), AppError> {
        self.update_transcript(id, |t| {
            t.status = TranscriptStatus::Processing.as_str().to_string();
            t.external_id = Some(external_id.to_string());
        })
    }

    async fn mark_completed(&self, id: &Uuid, language: &str, data: serde_json::Value) -> Result<(), AppError> {
        self.update_transcript(id, |t| {
            t.status = TranscriptStatus::Completed.as_str().to_string();
            t.language = language.to_string();
            t.data = Some(data);
            t.completed_at = Some(Utc::now());
        })
    }

    async fn mark_failed(&self, id: &Uuid, data: serde_json::Value) -> Result<(), AppError> {
        self.update_transcript(id, |t| {
            t.status = TranscriptStatus::Failed.as_str().to_string();
            t.data = Some(data);
        })
    }

    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<Transcript>, AppError> {
        Ok(self
            .transcripts
            .iter()
            .find(|t| t.external_id.as_deref() == Some(external_id))
            .map(|t| t.clone()))
    }
}

#[async_trait]
impl WebhookStore for InMemoryStore {
    async fn create(
        &self,
        org_id: &Uuid,
        user_id: &Uuid,
        url: &str,
        secret: &str,
        events: &[String],
    ) -> Result<Webhook, AppError> {
        let webhook = Webhook {
            id: Uuid::new_v4(),
            org_id: *org_id,
            user_id: *user_id,
            url: url.to_string(),
            secret: secret.to_string(),
            events: events.to_vec(),
            active: true,
            created_at: Utc::now(),
        };
        self.webhooks.insert(webhook.id, webhook.clone());
        Ok(webhook)
    }

    async fn list_for_org(&self, org_id: &Uuid) -> Result<Vec<Webhook>, AppError> {
        Ok(self
            .webhooks
            .iter()
            .filter(|w| &w.org_id == org_id)
            .map(|w| w.clone())
            .collect())
    }

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Webhook>, AppError> {
        Ok(self.webhooks.get(id).map(|w| w.clone()))
    }

    async fn delete(&self, id: &Uuid) -> Result<(), AppError> {
        self.webhooks.remove(id);
        Ok(())
    }

    async fn update_secret(&self, id: &Uuid, secret: &str) -> Result<(), AppError> {
        if let Some(mut w) = self.webhooks.get_mut(id) {
            w.secret = secret.to_string();
        }
        Ok(())
    }
}
