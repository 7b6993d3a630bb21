use log::warn;
use uuid::Uuid;

use crate::db::repositories::OrganizationStore;
use crate::error::AppError;
use crate::models::AuthenticatedUser;

/// Organization a request acts on.
///
/// API keys are bound to one organization. Dashboard users act on their
/// first membership.
pub async fn resolve_org_id(
    organizations: &dyn OrganizationStore,
    user: &AuthenticatedUser,
) -> Result<Uuid, AppError> {
    if let Some(org_id) = user.org_id {
        return Ok(org_id);
    }

    match organizations.primary_org_for_user(&user.user_id).await? {
        Some(org_id) => Ok(org_id),
        None => {
            warn!("User {} has no organization membership", user.user_id);
            Err(AppError::BadRequest("No organization found".to_string()))
        }
    }
}
