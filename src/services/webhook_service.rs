use std::sync::Arc;

use log::info;
use url::Url;
use uuid::Uuid;

use crate::db::repositories::WebhookStore;
use crate::error::AppError;
use crate::models::webhook::{CreateWebhookRequest, DEFAULT_WEBHOOK_EVENTS, Webhook};
use crate::security::webhook_signature::generate_webhook_secret;

/// Webhook endpoint registration for an organization.
#[derive(Clone)]
pub struct WebhookService {
    webhooks: Arc<dyn WebhookStore>,
}

fn validate_endpoint_url(raw: &str) -> Result<(), AppError> {
    let parsed = Url::parse(raw.trim())
        .map_err(|_| AppError::Validation(format!("Invalid webhook URL: {}", raw)))?;

    match parsed.scheme() {
        "http" | "https" if parsed.host_str().is_some() => Ok(()),
        _ => Err(AppError::Validation(
            "Webhook URL must be an absolute http(s) URL".to_string(),
        )),
    }
}

impl WebhookService {
    pub fn new(webhooks: Arc<dyn WebhookStore>) -> Self {
        Self { webhooks }
    }

    pub async fn create(
        &self,
        org_id: &Uuid,
        user_id: &Uuid,
        request: CreateWebhookRequest,
    ) -> Result<Webhook, AppError> {
        validate_endpoint_url(&request.url)?;

        let events: Vec<String> = match request.events {
            Some(events) if !events.is_empty() => events,
            _ => DEFAULT_WEBHOOK_EVENTS.iter().map(|e| e.to_string()).collect(),
        };

        let secret = generate_webhook_secret();
        let webhook = self
            .webhooks
            .create(org_id, user_id, request.url.trim(), &secret, &events)
            .await?;

        info!("Registered webhook {} for org {}", webhook.id, org_id);
        Ok(webhook)
    }

    pub async fn find_all(&self, org_id: &Uuid) -> Result<Vec<Webhook>, AppError> {
        self.webhooks.list_for_org(org_id).await
    }

    /// Webhooks of other organizations are reported as missing.
    pub async fn find_one(&self, id: &Uuid, org_id: &Uuid) -> Result<Webhook, AppError> {
        match self.webhooks.find_by_id(id).await? {
            Some(webhook) if &webhook.org_id == org_id => Ok(webhook),
            _ => Err(AppError::NotFound("Webhook not found".to_string())),
        }
    }

    pub async fn delete(&self, id: &Uuid, org_id: &Uuid) -> Result<(), AppError> {
        self.find_one(id, org_id).await?;
        self.webhooks.delete(id).await?;
        info!("Deleted webhook {} for org {}", id, org_id);
        Ok(())
    }

    /// Replaces the signing secret and returns the new one.
    pub async fn rotate_secret(&self, id: &Uuid, org_id: &Uuid) -> Result<String, AppError> {
        self.find_one(id, org_id).await?;
        let secret = generate_webhook_secret();
        self.webhooks.update_secret(id, &secret).await?;
        info!("Webhook {} secret rotated", id);
        Ok(secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::InMemoryStore;
    use pretty_assertions::assert_eq;

    fn request(url: &str, events: Option<Vec<&str>>) -> CreateWebhookRequest {
        CreateWebhookRequest {
            url: url.to_string(),
            events: events.map(|e| e.into_iter().map(str::to_string).collect()),
        }
    }

    #[tokio::test]
    async fn test_create_defaults_events_and_secret() {
        let store = Arc::new(InMemoryStore::new());
        let svc = WebhookService::new(store);
        let org = Uuid::new_v4();

        let webhook = svc
            .create(&org, &Uuid::new_v4(), request("https://example.com/hooks", None))
            .await
            .unwrap();

        assert_eq!(webhook.events, vec!["job.completed".to_string(), "export.ready".to_string()]);
        assert_eq!(webhook.secret.len(), 64);
        assert!(webhook.active);
    }

    #[tokio::test]
    async fn test_create_rejects_non_http_urls() {
        let svc = WebhookService::new(Arc::new(InMemoryStore::new()));
        for url in ["ftp://example.com/x", "not a url", "mailto:ops@example.com"] {
            let result = svc.create(&Uuid::new_v4(), &Uuid::new_v4(), request(url, None)).await;
            assert!(matches!(result, Err(AppError::Validation(_))), "url {}", url);
        }
    }

    #[tokio::test]
    async fn test_other_org_cannot_see_or_delete() {
        let store = Arc::new(InMemoryStore::new());
        let svc = WebhookService::new(store);
        let org = Uuid::new_v4();
        let intruder = Uuid::new_v4();
        let webhook = svc
            .create(&org, &Uuid::new_v4(), request("https://example.com/a", Some(vec!["job.completed"])))
            .await
            .unwrap();

        assert!(matches!(svc.find_one(&webhook.id, &intruder).await, Err(AppError::NotFound(_))));
        assert!(matches!(svc.delete(&webhook.id, &intruder).await, Err(AppError::NotFound(_))));
        assert!(matches!(svc.rotate_secret(&webhook.id, &intruder).await, Err(AppError::NotFound(_))));
        assert!(svc.find_all(&intruder).await.unwrap().is_empty());

        svc.delete(&webhook.id, &org).await.unwrap();
        assert!(svc.find_all(&org).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rotate_secret_replaces_secret() {
        let store = Arc::new(InMemoryStore::new());
        let svc = WebhookService::new(store);
        let org = Uuid::new_v4();
        let webhook = svc
            .create(&org, &Uuid::new_v4(), request("http://localhost:9000/hook", None))
            .await
            .unwrap();

        let rotated = svc.rotate_secret(&webhook.id, &org).await.unwrap();
        assert_ne!(rotated, webhook.secret);
        assert_eq!(svc.find_one(&webhook.id, &org).await.unwrap().secret, rotated);
    }
}
