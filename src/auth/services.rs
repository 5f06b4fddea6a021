use tracing::info;

use super::repo::UserRepository;
use crate::domain::{Subject, User};

/// Maps a verified subject to the local user, creating it on first sight.
pub async fn resolve_user(users: &dyn UserRepository, subject: Subject) -> anyhow::Result<User> {
    if let Some(user) = users.find_by_subject(&subject).await? {
        return Ok(user);
    }
    let user = users.save(&User::create(subject)).await?;
    info!(user_id = %user.id, "user provisioned");
    Ok(user)
}
