use crate::directory::guest_directory::GuestDirectory;
use async_trait::async_trait;
use castroom_core::{Guest, StudioError};
use tracing::debug;

/// Guest lookup over `GET {base}/episodes/{episode_id}/guests`.
#[derive(Clone)]
pub struct HttpGuestDirectory {
    client: reqwest::Client,
    base_url: String,
}

impl HttpGuestDirectory {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self { client, base_url }
    }

    pub fn episode_url(&self, episode_id: &str) -> String {
        format!("{}/episodes/{}/guests", self.base_url, episode_id)
    }
}

#[async_trait]
impl GuestDirectory for HttpGuestDirectory {
    async fn guests_for_episode(&self, episode_id: &str) -> Result<Vec<Guest>, StudioError> {
        let url = self.episode_url(episode_id);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| StudioError::Directory(format!("request to {url} failed: {e}")))?;

        if !response.status().is_success() {
            return Err(StudioError::Directory(format!(
                "{url} returned {}",
                response.status()
            )));
        }

        response
            .json::<Vec<Guest>>()
            .await
            .map_err(|e| StudioError::Directory(format!("invalid guest list from {url}: {e}")))
    }
}
