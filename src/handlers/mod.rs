pub mod api_key_handlers;
pub mod assemblyai_webhook_handlers;
pub mod health;
pub mod org_context;
pub mod project_handlers;
pub mod proxy_handlers;
pub mod public_api_handlers;
pub mod webhook_handlers;
