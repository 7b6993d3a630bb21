use std::sync::Arc;

use log::info;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::repositories::{AssetStore, ProjectStore};
use crate::error::AppError;
use crate::models::project::AssetKind;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestRequest {
    pub source_url: Option<String>,
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestResponse {
    pub asset_id: Uuid,
    pub status: String,
}

/// Registers uploaded source media against a project.
#[derive(Clone)]
pub struct IngestionService {
    projects: Arc<dyn ProjectStore>,
    assets: Arc<dyn AssetStore>,
}

impl IngestionService {
    pub fn new(projects: Arc<dyn ProjectStore>, assets: Arc<dyn AssetStore>) -> Self {
        Self { projects, assets }
    }

    pub async fn ingest(
        &self,
        project_id: &Uuid,
        org_id: &Uuid,
        request: IngestRequest,
    ) -> Result<IngestResponse, AppError> {
        match self.projects.find_by_id(project_id).await? {
            Some(project) if project.is_owned_by(org_id) => {}
            _ => return Err(AppError::NotFound("Project not found".to_string())),
        }

        let source_url = request
            .source_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty());

        let asset = self
            .assets
            .create_asset(
                project_id,
                AssetKind::Original,
                source_url.unwrap_or_default(),
                request.mime_type.as_deref(),
            )
            .await?;

        self.projects.mark_ingesting(project_id, source_url).await?;

        info!("Ingesting project {} (asset {})", project_id, asset.id);
        Ok(IngestResponse {
            asset_id: asset.id,
            status: "ingesting".to_string(),
        })
    }
}
