use std::sync::Arc;

use log::{error, info, warn};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::clients::assemblyai_client::AssemblyAiClient;
use crate::config::AppSettings;
use crate::db::repositories::{ProjectStore, TranscriptStore};
use crate::error::AppError;
use crate::models::project::ProjectStatus;
use crate::models::transcript::TranscriptStatus;
use crate::services::proxy_token_service::ProxyTokenService;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptionStarted {
    pub transcript_id: Uuid,
    pub status: TranscriptStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
}

/// Kicks off AssemblyAI transcription of a project's source media.
///
/// AssemblyAI fetches the media through the proxy endpoint using a
/// short-lived token and reports back on `/webhooks/assemblyai`.
#[derive(Clone)]
pub struct TranscriptionService {
    projects: Arc<dyn ProjectStore>,
    transcripts: Arc<dyn TranscriptStore>,
    proxy_tokens: Arc<ProxyTokenService>,
    client: Option<AssemblyAiClient>,
    api_base_url: String,
}

impl TranscriptionService {
    pub fn new(
        projects: Arc<dyn ProjectStore>,
        transcripts: Arc<dyn TranscriptStore>,
        proxy_tokens: Arc<ProxyTokenService>,
        client: Option<AssemblyAiClient>,
        api_base_url: &str,
    ) -> Self {
        Self {
            projects,
            transcripts,
            proxy_tokens,
            client,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_settings(
        settings: &AppSettings,
        projects: Arc<dyn ProjectStore>,
        transcripts: Arc<dyn TranscriptStore>,
        proxy_tokens: Arc<ProxyTokenService>,
    ) -> Result<Self, AppError> {
        let client = match settings.assemblyai.api_key.as_deref() {
            Some(key) => {
                info!("AssemblyAI transcription enabled");
                Some(AssemblyAiClient::with_default_http(key, &settings.assemblyai.base_url)?)
            }
            None => {
                warn!("AssemblyAI API key not configured, transcription disabled");
                None
            }
        };

        Ok(Self::new(
            projects,
            transcripts,
            proxy_tokens,
            client,
            &settings.server.api_base_url,
        ))
    }

    pub async fn start_transcription(
        &self,
        project_id: &Uuid,
        org_id: &Uuid,
    ) -> Result<TranscriptionStarted, AppError> {
        let Some(client) = self.client.as_ref() else {
            return Err(AppError::Configuration("Transcription is not configured".to_string()));
        };

        let project = match self.projects.find_by_id(project_id).await? {
            Some(project) if project.is_owned_by(org_id) => project,
            _ => return Err(AppError::NotFound("Project not found".to_string())),
        };

        if project.source_url.as_deref().map_or(true, str::is_empty) {
            return Err(AppError::BadRequest("Project has no source media".to_string()));
        }

        // The project id doubles as the asset id for the source media
        let audio_url = self.proxy_tokens.generate_proxy_url(
            project.id,
            project.id,
            project.org_id,
            &self.api_base_url,
        )?;
        let webhook_url = format!("{}/webhooks/assemblyai", self.api_base_url);

        let transcript = self.transcripts.upsert_pending(&project.id).await?;

        match client.submit_transcript(&audio_url, &webhook_url).await {
            Ok(external_id) => {
                self.transcripts.mark_processing(&transcript.id, &external_id).await?;
                self.projects.update_status(&project.id, ProjectStatus::Processing).await?;
                info!(
                    "Transcription {} submitted for project {} (external id {})",
                    transcript.id, project.id, external_id
                );
                Ok(TranscriptionStarted {
                    transcript_id: transcript.id,
                    status: TranscriptStatus::Processing,
                    external_id: Some(external_id),
                })
            }
            Err(e) => {
                error!("Failed to start transcription for project {}: {}", project.id, e);
                self.transcripts
                    .mark_failed(&transcript.id, json!({ "error": e.to_string() }))
                    .await?;
                Ok(TranscriptionStarted {
                    transcript_id: transcript.id,
                    status: TranscriptStatus::Failed,
                    external_id: None,
                })
            }
        }
    }
}
