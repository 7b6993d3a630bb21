use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Subscription plan of an organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tier {
    Free,
    Starter,
    Pro,
    Business,
}

/// Per-key limits derived from the owning organization's tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TierLimits {
    /// Requests per minute
    pub rate_limit: i32,
    /// Transcription minutes per month
    pub quota_minutes: i32,
    /// Exports per month
    pub quota_exports: i32,
}

impl Tier {
    /// Parses a stored tier name. Unknown values fall back to `Free`.
    pub fn from_db(value: &str) -> Self {
        value.parse().unwrap_or(Tier::Free)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Free => "FREE",
            Tier::Starter => "STARTER",
            Tier::Pro => "PRO",
            Tier::Business => "BUSINESS",
        }
    }

    pub fn limits(&self) -> TierLimits {
        match self {
            Tier::Free => TierLimits { rate_limit: 10, quota_minutes: 60, quota_exports: 10 },
            Tier::Starter => TierLimits { rate_limit: 30, quota_minutes: 300, quota_exports: 50 },
            Tier::Pro => TierLimits { rate_limit: 100, quota_minutes: 1000, quota_exports: 200 },
            Tier::Business => TierLimits { rate_limit: 500, quota_minutes: 5000, quota_exports: 1000 },
        }
    }

    /// Maximum number of API keys an organization on this tier may hold.
    pub fn max_api_keys(&self) -> i64 {
        match self {
            Tier::Free => 1,
            Tier::Starter => 3,
            Tier::Pro => 10,
            Tier::Business => 50,
        }
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FREE" => Ok(Tier::Free),
            "STARTER" => Ok(Tier::Starter),
            "PRO" => Ok(Tier::Pro),
            "BUSINESS" => Ok(Tier::Business),
            other => Err(format!("unknown tier: {}", other)),
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored API key. The plaintext key is never persisted, only its hash.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ApiKey {
    pub id: Uuid,
    pub org_id: Uuid,
    pub user_id: Uuid,
    pub key_hash: String,
    pub name: String,
    pub rate_limit: i32,
    pub quota_minutes: i32,
    pub quota_exports: i32,
    pub last_used_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ApiKey {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }
}

/// Client-facing view of an API key.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeySummary {
    pub id: Uuid,
    pub name: String,
    pub rate_limit: i32,
    pub quota_minutes: i32,
    pub quota_exports: i32,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<ApiKey> for ApiKeySummary {
    fn from(key: ApiKey) -> Self {
        Self {
            id: key.id,
            name: key.name,
            rate_limit: key.rate_limit,
            quota_minutes: key.quota_minutes,
            quota_exports: key.quota_exports,
            last_used_at: key.last_used_at,
            created_at: key.created_at,
            expires_at: key.expires_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyUsage {
    pub id: Uuid,
    pub name: String,
    pub last_used: Option<DateTime<Utc>>,
    pub created: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyStats {
    pub total_keys: usize,
    pub active_keys: usize,
    pub keys: Vec<ApiKeyUsage>,
}

impl ApiKeyStats {
    /// A key counts as active once it has been used at least once.
    pub fn from_keys(keys: Vec<ApiKey>) -> Self {
        let active_keys = keys.iter().filter(|k| k.last_used_at.is_some()).count();
        Self {
            total_keys: keys.len(),
            active_keys,
            keys: keys
                .into_iter()
                .map(|k| ApiKeyUsage {
                    id: k.id,
                    name: k.name,
                    last_used: k.last_used_at,
                    created: k.created_at,
                })
                .collect(),
        }
    }
}

/// Returned exactly once, at creation time.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedApiKey {
    pub id: Uuid,
    pub key: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_tier_limits_table() {
        assert_eq!(Tier::Free.limits(), TierLimits { rate_limit: 10, quota_minutes: 60, quota_exports: 10 });
        assert_eq!(Tier::Starter.limits().rate_limit, 30);
        assert_eq!(Tier::Pro.limits().quota_minutes, 1000);
        assert_eq!(Tier::Business.limits().quota_exports, 1000);
    }

    #[test]
    fn test_max_api_keys_table() {
        assert_eq!(Tier::Free.max_api_keys(), 1);
        assert_eq!(Tier::Starter.max_api_keys(), 3);
        assert_eq!(Tier::Pro.max_api_keys(), 10);
        assert_eq!(Tier::Business.max_api_keys(), 50);
    }

    #[test]
    fn test_unknown_tier_falls_back_to_free() {
        assert_eq!(Tier::from_db("ENTERPRISE"), Tier::Free);
        assert_eq!(Tier::from_db("pro"), Tier::Pro);
    }

    fn key(last_used: Option<DateTime<Utc>>, expires_at: Option<DateTime<Utc>>) -> ApiKey {
        ApiKey {
            id: Uuid::new_v4(),
            org_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            key_hash: "hash".to_string(),
            name: "key".to_string(),
            rate_limit: 10,
            quota_minutes: 60,
            quota_exports: 10,
            last_used_at: last_used,
            expires_at,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_stats_count_active_keys() {
        let stats = ApiKeyStats::from_keys(vec![key(Some(Utc::now()), None), key(None, None), key(None, None)]);
        assert_eq!(stats.total_keys, 3);
        assert_eq!(stats.active_keys, 1);
        assert_eq!(stats.keys.len(), 3);
    }

    #[test]
    fn test_expiry() {
        let now = Utc::now();
        assert!(!key(None, None).is_expired_at(now));
        assert!(!key(None, Some(now + Duration::days(1))).is_expired_at(now));
        assert!(key(None, Some(now - Duration::seconds(1))).is_expired_at(now));
    }

    #[test]
    fn test_summary_hides_hash() {
        let json = serde_json::to_value(ApiKeySummary::from(key(None, None))).unwrap();
        assert!(json.get("keyHash").is_none());
        assert_eq!(json["rateLimit"], 10);
    }
}
