pub mod api_key_repository;
pub mod organization_repository;
pub mod project_repository;
pub mod transcript_repository;
pub mod webhook_repository;

#[cfg(test)]
pub mod memory;

pub use api_key_repository::{ApiKeyRepository, ApiKeyStore, NewApiKey};
pub use organization_repository::{OrganizationRepository, OrganizationStore};
pub use project_repository::{AssetRepository, AssetStore, ProjectRepository, ProjectStore};
pub use transcript_repository::{TranscriptRepository, TranscriptStore};
pub use webhook_repository::{WebhookRepository, WebhookStore};
#[cfg(test)]
pub use memory::InMemoryStore;
