use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TranscriptStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl TranscriptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TranscriptStatus::Pending => "PENDING",
            TranscriptStatus::Processing => "PROCESSING",
            TranscriptStatus::Completed => "COMPLETED",
            TranscriptStatus::Failed => "FAILED",
        }
    }
}

impl FromStr for TranscriptStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(TranscriptStatus::Pending),
            "PROCESSING" => Ok(TranscriptStatus::Processing),
            "COMPLETED" => Ok(TranscriptStatus::Completed),
            "FAILED" => Ok(TranscriptStatus::Failed),
            other => Err(format!("unknown transcript status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Transcript {
    pub id: Uuid,
    pub project_id: Uuid,
    /// Transcript id assigned by AssemblyAI
    pub external_id: Option<String>,
    pub status: String,
    pub language: String,
    pub data: Option<serde_json::Value>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Transcript {
    pub fn status(&self) -> Option<TranscriptStatus> {
        self.status.parse().ok()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranscriptWord {
    pub text: String,
    pub start: i64,
    pub end: i64,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranscriptUtterance {
    pub text: String,
    pub start: i64,
    pub end: i64,
    pub speaker: String,
    pub confidence: f64,
}

/// Persisted body of a completed transcript.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranscriptData {
    pub text: String,
    pub words: Vec<TranscriptWord>,
    pub segments: Vec<TranscriptUtterance>,
    pub language: String,
    pub wpm: u32,
    pub confidence: f64,
}
