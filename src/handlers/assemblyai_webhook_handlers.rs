//! Completion callbacks from AssemblyAI.

use actix_web::{HttpRequest, HttpResponse, web};
use log::{error, info, warn};
use serde::Deserialize;
use serde_json::json;

use crate::config::settings::AssemblyAiConfig;
use crate::db::repositories::{ProjectStore, TranscriptStore};
use crate::error::AppError;
use crate::models::project::ProjectStatus;
use crate::models::transcript::{TranscriptData, TranscriptUtterance, TranscriptWord};
use crate::security::webhook_signature::verify_signature;

pub const ASSEMBLYAI_SIGNATURE_HEADER: &str = "x-assemblyai-signature";

#[derive(Debug, Deserialize)]
pub struct AssemblyAiWebhookPayload {
    pub transcript_id: String,
    pub status: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub words: Option<Vec<TranscriptWord>>,
    #[serde(default)]
    pub utterances: Option<Vec<TranscriptUtterance>>,
    #[serde(default)]
    pub language_code: Option<String>,
    /// Seconds
    #[serde(default)]
    pub audio_duration: Option<f64>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Words per minute over the audio duration, 0 when the duration is unknown.
pub fn words_per_minute(word_count: usize, audio_duration_secs: f64) -> u32 {
    let minutes = audio_duration_secs / 60.0;
    if minutes > 0.0 {
        (word_count as f64 / minutes).round() as u32
    } else {
        0
    }
}

pub fn average_confidence(words: &[TranscriptWord]) -> f64 {
    if words.is_empty() {
        return 0.0;
    }
    words.iter().map(|w| w.confidence).sum::<f64>() / words.len() as f64
}

fn transcript_data(payload: AssemblyAiWebhookPayload) -> TranscriptData {
    let words = payload.words.unwrap_or_default();
    let wpm = words_per_minute(words.len(), payload.audio_duration.unwrap_or(0.0));
    let confidence = average_confidence(&words);

    TranscriptData {
        text: payload.text.unwrap_or_default(),
        words,
        segments: payload.utterances.unwrap_or_default(),
        language: payload.language_code.unwrap_or_else(|| "en".to_string()),
        wpm,
        confidence,
    }
}

async fn handle_completed(
    payload: AssemblyAiWebhookPayload,
    transcripts: &dyn TranscriptStore,
    projects: &dyn ProjectStore,
) -> Result<(), AppError> {
    let Some(transcript) = transcripts.find_by_external_id(&payload.transcript_id).await? else {
        warn!("Transcript not found for AssemblyAI id {}", payload.transcript_id);
        return Ok(());
    };

    let data = transcript_data(payload);
    let (word_count, wpm) = (data.words.len(), data.wpm);

    transcripts
        .mark_completed(&transcript.id, &data.language, serde_json::to_value(&data)?)
        .await?;
    projects.update_status(&transcript.project_id, ProjectStatus::Transcribed).await?;

    info!("Transcript completed: {} ({} words, {} WPM)", transcript.id, word_count, wpm);
    Ok(())
}

async fn handle_error(payload: AssemblyAiWebhookPayload, transcripts: &dyn TranscriptStore) -> Result<(), AppError> {
    let Some(transcript) = transcripts.find_by_external_id(&payload.transcript_id).await? else {
        warn!("Transcript not found for AssemblyAI id {}", payload.transcript_id);
        return Ok(());
    };

    let message = payload.error.unwrap_or_else(|| "Unknown error".to_string());
    transcripts
        .mark_failed(&transcript.id, json!({ "error": message }))
        .await?;

    error!("Transcript failed: {} - {}", transcript.id, message);
    Ok(())
}

/// POST /webhooks/assemblyai
///
/// The signature is computed over the raw body, so the payload is parsed
/// only after verification.
pub async fn assemblyai_webhook(
    req: HttpRequest,
    body: web::Bytes,
    config: web::Data<AssemblyAiConfig>,
    transcripts: web::Data<dyn TranscriptStore>,
    projects: web::Data<dyn ProjectStore>,
) -> Result<HttpResponse, AppError> {
    if let Some(secret) = config.webhook_secret.as_deref() {
        let signature = req
            .headers()
            .get(ASSEMBLYAI_SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok());
        if let Err(e) = verify_signature(secret, &body, signature) {
            warn!("Rejected AssemblyAI webhook: {}", e);
            return Err(e);
        }
    }

    let payload: AssemblyAiWebhookPayload = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid webhook payload: {}", e)))?;

    info!("Received AssemblyAI webhook: {} - {}", payload.transcript_id, payload.status);

    match payload.status.as_str() {
        "completed" => handle_completed(payload, transcripts.get_ref(), projects.get_ref()).await?,
        "error" => {
            if let Err(e) = handle_error(payload, transcripts.get_ref()).await {
                error!("Failed to record transcription error: {}", e);
            }
        }
        other => info!("Ignoring AssemblyAI status {}", other),
    }

    Ok(HttpResponse::Ok().json(json!({ "received": true })))
}
