use async_trait::async_trait;
use castroom_core::{Guest, ParticipantId, StudioError};
use tracing::warn;

/// Source of the episode guest list.
#[async_trait]
pub trait GuestDirectory: Send + Sync {
    async fn guests_for_episode(&self, episode_id: &str) -> Result<Vec<Guest>, StudioError>;
}

/// Authoritative display name for `guest_id`, or `fallback` when the lookup
/// fails or does not know the guest.
pub async fn resolve_guest_name(
    directory: &dyn GuestDirectory,
    episode_id: &str,
    guest_id: &ParticipantId,
    fallback: &str,
) -> String {
    match directory.guests_for_episode(episode_id).await {
        Ok(guests) => guests
            .into_iter()
            .find(|g| g.id == guest_id.as_str())
            .map(|g| g.name)
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| fallback.to_owned()),
        Err(e) => {
            warn!("Guest lookup for episode {} failed: {}", episode_id, e);
            fallback.to_owned()
        }
    }
}
