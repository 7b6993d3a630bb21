use std::sync::Arc;

use chrono::{Duration, Utc};
use log::{debug, info, warn};
use uuid::Uuid;

use crate::db::repositories::{ApiKeyStore, NewApiKey, OrganizationStore};
use crate::error::AppError;
use crate::models::api_key::{ApiKey, ApiKeyStats, ApiKeySummary, CreatedApiKey};
use crate::security::api_key_hashing::{generate_api_key, hash_api_key, looks_like_api_key};

/// Issues, validates and manages organization API keys.
#[derive(Clone)]
pub struct ApiKeyService {
    api_keys: Arc<dyn ApiKeyStore>,
    organizations: Arc<dyn OrganizationStore>,
    hash_secret: Arc<str>,
}

impl ApiKeyService {
    pub fn new(
        api_keys: Arc<dyn ApiKeyStore>,
        organizations: Arc<dyn OrganizationStore>,
        hash_secret: &str,
    ) -> Self {
        Self {
            api_keys,
            organizations,
            hash_secret: Arc::from(hash_secret),
        }
    }

    /// Creates a key with limits copied from the organization's tier.
    ///
    /// The plaintext key is returned here and never again.
    pub async fn generate_api_key(
        &self,
        org_id: &Uuid,
        user_id: &Uuid,
        name: Option<String>,
        expires_in_days: Option<i64>,
    ) -> Result<CreatedApiKey, AppError> {
        let org = self
            .organizations
            .find_by_id(org_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Organization not found".to_string()))?;

        let now = Utc::now();
        let expires_at = match expires_in_days {
            None => None,
            Some(days) if days <= 0 => {
                return Err(AppError::Validation("expiresInDays must be positive".to_string()));
            }
            Some(days) => Some(
                Duration::try_days(days)
                    .and_then(|d| now.checked_add_signed(d))
                    .ok_or_else(|| AppError::Validation("expiresInDays is out of range".to_string()))?,
            ),
        };

        let key = generate_api_key();
        let key_hash = hash_api_key(&key, &self.hash_secret)?;

        let name = name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| format!("API Key {}", now.format("%Y-%m-%d")));

        let record = self
            .api_keys
            .create_key(NewApiKey {
                org_id: *org_id,
                user_id: *user_id,
                key_hash,
                name,
                limits: org.tier().limits(),
                expires_at,
            })
            .await?;

        info!("Created API key {} for org {} (tier {})", record.id, org_id, org.tier());
        Ok(CreatedApiKey { id: record.id, key })
    }

    /// Whether the organization is still below its tier's key allowance.
    pub async fn can_create_api_key(&self, org_id: &Uuid) -> Result<bool, AppError> {
        let Some(org) = self.organizations.find_by_id(org_id).await? else {
            return Ok(false);
        };

        let count = self.api_keys.count_for_org(org_id).await?;
        Ok(count < org.tier().max_api_keys())
    }

    /// Resolves a presented key to its active record and records the use.
    ///
    /// Returns `None` for unknown, malformed or expired keys.
    pub async fn validate_api_key(&self, raw_key: &str) -> Result<Option<ApiKey>, AppError> {
        if !looks_like_api_key(raw_key) {
            debug!("Rejected API key with unexpected format");
            return Ok(None);
        }

        let key_hash = hash_api_key(raw_key, &self.hash_secret)?;
        let Some(record) = self.api_keys.find_active_by_hash(&key_hash).await? else {
            return Ok(None);
        };

        let store = self.api_keys.clone();
        let api_key_id = record.id;
        tokio::spawn(async move {
            if let Err(e) = store.touch_usage(&api_key_id).await {
                warn!("Failed to update API key usage for {}: {}", api_key_id, e);
            }
        });

        Ok(Some(record))
    }

    pub async fn list_api_keys(&self, org_id: &Uuid) -> Result<Vec<ApiKeySummary>, AppError> {
        let keys = self.api_keys.list_for_org(org_id).await?;
        Ok(keys.into_iter().map(ApiKeySummary::from).collect())
    }

    pub async fn get_api_key_stats(&self, org_id: &Uuid) -> Result<ApiKeyStats, AppError> {
        let keys = self.api_keys.list_for_org(org_id).await?;
        Ok(ApiKeyStats::from_keys(keys))
    }

    pub async fn update_api_key(&self, key_id: &Uuid, org_id: &Uuid, name: &str) -> Result<(), AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Name must not be empty".to_string()));
        }

        if !self.api_keys.update_name(key_id, org_id, name).await? {
            return Err(AppError::NotFound("API key not found".to_string()));
        }
        Ok(())
    }

    pub async fn revoke_api_key(&self, key_id: &Uuid, org_id: &Uuid) -> Result<(), AppError> {
        if !self.api_keys.delete_for_org(key_id, org_id).await? {
            return Err(AppError::NotFound("API key not found".to_string()));
        }
        info!("Revoked API key {} for org {}", key_id, org_id);
        Ok(())
    }
}
