use log::{debug, error};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::utils::http_client::new_api_client;

pub const DEFAULT_ASSEMBLYAI_BASE_URL: &str = "https://api.assemblyai.com";

#[derive(Debug, Error)]
pub enum AssemblyAiError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },
    #[error("unexpected response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Serialize)]
struct SubmitTranscriptRequest<'a> {
    audio_url: &'a str,
    speaker_labels: bool,
    webhook_url: &'a str,
}

#[derive(Debug, Deserialize)]
struct SubmitTranscriptResponse {
    id: String,
    #[serde(default)]
    status: Option<String>,
}

/// Asynchronous transcription submission. Results arrive on the webhook.
#[derive(Debug, Clone)]
pub struct AssemblyAiClient {
    http: Client,
    api_key: String,
    base_url: String,
}

impl AssemblyAiClient {
    pub fn new(http: Client, api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            http,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn with_default_http(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, crate::error::AppError> {
        Ok(Self::new(new_api_client()?, api_key, base_url))
    }

    /// Submits `audio_url` for transcription with speaker labels and
    /// returns the AssemblyAI transcript id.
    pub async fn submit_transcript(&self, audio_url: &str, webhook_url: &str) -> Result<String, AssemblyAiError> {
        let url = format!("{}/v2/transcript", self.base_url);
        let body = SubmitTranscriptRequest {
            audio_url,
            speaker_labels: true,
            webhook_url,
        };

        let response = self
            .http
            .post(&url)
            .header("authorization", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            error!("AssemblyAI rejected transcript submission ({}): {}", status, body);
            return Err(AssemblyAiError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: SubmitTranscriptResponse = response
            .json()
            .await
            .map_err(|e| AssemblyAiError::InvalidResponse(e.to_string()))?;

        if parsed.id.is_empty() {
            return Err(AssemblyAiError::InvalidResponse("missing transcript id".to_string()));
        }

        debug!(
            "AssemblyAI transcript {} submitted (status {})",
            parsed.id,
            parsed.status.as_deref().unwrap_or("unknown")
        );
        Ok(parsed.id)
    }
}
