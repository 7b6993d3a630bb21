//! Media proxy for the transcription provider.
//!
//! AssemblyAI fetches `GET /internal/assemblyai/pull/{asset_id}?token=...` with a short-lived
//! proxy token. Ownership is re-checked against the current project row on every request,
//! and single `bytes=` ranges are served as 206 responses so the provider can stream.

use actix_web::http::header;
use actix_web::{HttpRequest, HttpResponse, ResponseError, web};
use log::{debug, info, warn};
use serde::Deserialize;
use uuid::Uuid;

use crate::db::repositories::ProjectStore;
use crate::error::AppError;
use crate::services::proxy_token_service::ProxyTokenService;
use crate::services::storage::{MediaStorage, storage_key_from_url};

const PROXY_CACHE_CONTROL: &str = "private, max-age=900";

#[derive(Debug, Deserialize)]
pub struct PullMediaQuery {
    pub token: Option<String>,
}

/// Resolves a `Range` header against an object of `size` bytes.
///
/// Returns the inclusive `(start, end)` to serve, or `None` when the range cannot be
/// satisfied: malformed, multiple ranges, start past the end, or an empty object.
/// An end beyond the object is clamped to the last byte; `bytes=-n` selects the last `n`.
pub fn parse_range(header_value: &str, size: u64) -> Option<(u64, u64)> {
    let ranges = header_value.trim().strip_prefix("bytes=")?.trim();
    if ranges.contains(',') || size == 0 {
        return None;
    }

    let (first, last) = ranges.split_once('-')?;
    let (first, last) = (first.trim(), last.trim());

    if first.is_empty() {
        let suffix_len: u64 = last.parse().ok()?;
        if suffix_len == 0 {
            return None;
        }
        return Some((size.saturating_sub(suffix_len), size - 1));
    }

    let start: u64 = first.parse().ok()?;
    let end: u64 = if last.is_empty() { size - 1 } else { last.parse().ok()? };

    if start >= size || end < start {
        return None;
    }

    Some((start, end.min(size - 1)))
}

fn range_not_satisfiable(size: u64) -> HttpResponse {
    let mut response =
        AppError::RangeNotSatisfiable(format!("Requested range not satisfiable for {} bytes", size))
            .error_response();
    if let Ok(value) = header::HeaderValue::from_str(&format!("bytes */{}", size)) {
        response.headers_mut().insert(header::CONTENT_RANGE, value);
    }
    response
}

fn media_unavailable() -> AppError {
    AppError::NotFound("Media not available".to_string())
}

/// GET /internal/assemblyai/pull/{asset_id}?token=...
pub async fn pull_media(
    req: HttpRequest,
    path: web::Path<String>,
    query: web::Query<PullMediaQuery>,
    tokens: web::Data<ProxyTokenService>,
    projects: web::Data<dyn ProjectStore>,
    storage: web::Data<dyn MediaStorage>,
) -> Result<HttpResponse, AppError> {
    let asset_param = path.into_inner();

    let token = match query.token.as_deref().filter(|t| !t.is_empty()) {
        Some(token) => token,
        None => {
            warn!("Missing token for asset {}", asset_param);
            return Err(AppError::NotFound("Token required".to_string()));
        }
    };

    let claims = tokens.validate_token(token)?;

    let asset_id = Uuid::parse_str(&asset_param)
        .map_err(|_| AppError::NotFound("Asset not found".to_string()))?;
    if claims.asset_id != asset_id {
        warn!("Proxy token for asset {} used for asset {}", claims.asset_id, asset_id);
        return Err(AppError::NotFound("Asset not found".to_string()));
    }

    let project = match projects.find_by_id(&asset_id).await? {
        Some(project) => project,
        None => {
            warn!("Project not found: {}", asset_id);
            return Err(AppError::NotFound("Asset not found".to_string()));
        }
    };

    if project.org_id != claims.org_id {
        warn!(
            "Org mismatch for asset {}: {} != {}",
            asset_id, project.org_id, claims.org_id
        );
        return Err(AppError::NotFound("Asset not found".to_string()));
    }

    let source_url = project.source_url.as_deref().ok_or_else(|| {
        warn!("No source URL for project {}", asset_id);
        media_unavailable()
    })?;

    let key = storage_key_from_url(source_url).map_err(|e| {
        warn!("Cannot derive storage key for project {}: {}", asset_id, e);
        media_unavailable()
    })?;
    info!("Proxying media {} for transcription", key);

    let metadata = storage.metadata(&key).await.map_err(|e| {
        warn!("Failed to read media metadata for {}: {}", key, e);
        media_unavailable()
    })?;

    let range_header = req
        .headers()
        .get(header::RANGE)
        .map(|v| v.to_str().unwrap_or_default().to_string());

    let Some(range_header) = range_header else {
        let body = storage.download(&key).await.map_err(|e| {
            warn!("Failed to download media {}: {}", key, e);
            media_unavailable()
        })?;

        return Ok(HttpResponse::Ok()
            .content_type(metadata.content_type.as_str())
            .insert_header((header::ACCEPT_RANGES, "bytes"))
            .insert_header((header::CACHE_CONTROL, PROXY_CACHE_CONTROL))
            .body(body));
    };

    let Some((start, end)) = parse_range(&range_header, metadata.size) else {
        warn!(
            "Unsatisfiable range '{}' for {} ({} bytes)",
            range_header, key, metadata.size
        );
        return Ok(range_not_satisfiable(metadata.size));
    };

    debug!("Range request: {}-{}/{}", start, end, metadata.size);

    let body = storage.download_range(&key, start, end).await.map_err(|e| {
        warn!("Failed to download range of {}: {}", key, e);
        media_unavailable()
    })?;

    Ok(HttpResponse::PartialContent()
        .content_type(metadata.content_type.as_str())
        .insert_header((
            header::CONTENT_RANGE,
            format!("bytes {}-{}/{}", start, end, metadata.size),
        ))
        .insert_header((header::ACCEPT_RANGES, "bytes"))
        .insert_header((header::CACHE_CONTROL, PROXY_CACHE_CONTROL))
        .body(body))
}
