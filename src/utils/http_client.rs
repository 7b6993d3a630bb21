use reqwest::Client;
use std::time::Duration;

use crate::error::AppError;

/// Shared client for outbound calls to the transcription provider.
pub fn new_api_client() -> Result<Client, AppError> {
    Client::builder()
        .timeout(Duration::from_secs(60))
        .connect_timeout(Duration::from_secs(10))
        // Below the provider's keep-alive so stale pooled connections are not reused
        .pool_idle_timeout(Some(Duration::from_secs(90)))
        .tcp_keepalive(Duration::from_secs(60))
        .build()
        .map_err(|e| AppError::Configuration(format!("Failed to build HTTP client: {}", e)))
}
