use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
    Pending,
    Ingesting,
    Processing,
    Transcribed,
    Completed,
    Failed,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Pending => "PENDING",
            ProjectStatus::Ingesting => "INGESTING",
            ProjectStatus::Processing => "PROCESSING",
            ProjectStatus::Transcribed => "TRANSCRIBED",
            ProjectStatus::Completed => "COMPLETED",
            ProjectStatus::Failed => "FAILED",
        }
    }
}

impl FromStr for ProjectStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(ProjectStatus::Pending),
            "INGESTING" => Ok(ProjectStatus::Ingesting),
            "PROCESSING" => Ok(ProjectStatus::Processing),
            "TRANSCRIBED" => Ok(ProjectStatus::Transcribed),
            "COMPLETED" => Ok(ProjectStatus::Completed),
            "FAILED" => Ok(ProjectStatus::Failed),
            other => Err(format!("unknown project status: {}", other)),
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub org_id: Uuid,
    pub title: String,
    /// Storage URL of the uploaded source media
    pub source_url: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn status(&self) -> Option<ProjectStatus> {
        self.status.parse().ok()
    }

    pub fn is_owned_by(&self, org_id: &Uuid) -> bool {
        &self.org_id == org_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetKind {
    Original,
    Proxy,
    Audio,
    Thumbnail,
}

impl AssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Original => "ORIGINAL",
            AssetKind::Proxy => "PROXY",
            AssetKind::Audio => "AUDIO",
            AssetKind::Thumbnail => "THUMBNAIL",
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: Uuid,
    pub project_id: Uuid,
    pub kind: String,
    pub url: String,
    pub mime_type: Option<String>,
    pub created_at: DateTime<Utc>,
}
