pub mod api_key_service;
pub mod auth;
pub mod ingestion_service;
pub mod proxy_token_service;
pub mod storage;
pub mod transcription_service;
pub mod webhook_service;
