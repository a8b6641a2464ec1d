use crate::directory::guest_directory::GuestDirectory;
use async_trait::async_trait;
use castroom_core::{Guest, StudioError};
use std::collections::HashMap;

/// Fixed guest lists keyed by episode. Unknown episodes are a lookup failure.
#[derive(Debug, Clone, Default)]
pub struct StaticGuestDirectory {
    episodes: HashMap<String, Vec<Guest>>,
}

impl StaticGuestDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_episode(mut self, episode_id: impl Into<String>, guests: Vec<Guest>) -> Self {
        self.episodes.insert(episode_id.into(), guests);
        self
    }
}

#[async_trait]
impl GuestDirectory for StaticGuestDirectory {
    async fn guests_for_episode(&self, episode_id: &str) -> Result<Vec<Guest>, StudioError> {
        self.episodes
            .get(episode_id)
            .cloned()
            .ok_or_else(|| StudioError::Directory(format!("unknown episode '{episode_id}'")))
    }
}
