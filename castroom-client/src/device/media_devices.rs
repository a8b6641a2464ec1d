use crate::device::local_stream::LocalTrack;
use async_trait::async_trait;
use castroom_core::{DeviceInfo, Resolution, StudioError};

/// Constraints for one kind of track.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackConstraints {
    pub device_id: Option<String>,
    pub resolution: Option<Resolution>,
}

/// What a `get_user_media` call asks for. `None` means the kind is not requested.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaConstraints {
    pub audio: Option<TrackConstraints>,
    pub video: Option<TrackConstraints>,
}

impl MediaConstraints {
    pub fn video(constraints: TrackConstraints) -> Self {
        Self {
            audio: None,
            video: Some(constraints),
        }
    }

    pub fn audio(constraints: TrackConstraints) -> Self {
        Self {
            audio: Some(constraints),
            video: None,
        }
    }
}

/// Platform media-device port.
#[async_trait]
pub trait MediaDevices: Send + Sync {
    /// List every known device. Labels are empty until permission was granted.
    async fn enumerate_devices(&self) -> Result<Vec<DeviceInfo>, StudioError>;

    /// Acquire tracks for the requested kinds.
    async fn get_user_media(
        &self,
        constraints: MediaConstraints,
    ) -> Result<Vec<LocalTrack>, StudioError>;

    /// Route playback to an output device.
    async fn set_sink_id(&self, device_id: &str) -> Result<(), StudioError>;

    fn supports_output_selection(&self) -> bool {
        true
    }
}
