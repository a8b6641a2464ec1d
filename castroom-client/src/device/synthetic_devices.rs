use crate::device::local_stream::LocalTrack;
use crate::device::media_devices::{MediaConstraints, MediaDevices, TrackConstraints};
use async_trait::async_trait;
use castroom_core::{DeviceInfo, DeviceKind, MediaKind, StudioError};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tracing::debug;

/// In-process device backend serving a fixed device list.
///
/// Behaves like a browser: labels stay hidden until a capture request
/// succeeds, and permission can be refused.
pub struct SyntheticDevices {
    devices: Vec<DeviceInfo>,
    granted: AtomicBool,
    deny: AtomicBool,
    output_selection: bool,
    sink: Mutex<Option<String>>,
}

impl SyntheticDevices {
    pub fn new(devices: Vec<DeviceInfo>) -> Self {
        Self {
            devices,
            granted: AtomicBool::new(false),
            deny: AtomicBool::new(false),
            output_selection: true,
            sink: Mutex::new(None),
        }
    }

    /// Two cameras, one microphone, two speakers.
    pub fn studio_kit() -> Self {
        Self::new(vec![
            DeviceInfo::new("cam-1", "Built-in Camera", DeviceKind::VideoInput),
            DeviceInfo::new("cam-2", "USB Capture", DeviceKind::VideoInput),
            DeviceInfo::new("mic-1", "Studio Microphone", DeviceKind::AudioInput),
            DeviceInfo::new("spk-1", "Headphones", DeviceKind::AudioOutput),
            DeviceInfo::new("spk-2", "Monitor Speakers", DeviceKind::AudioOutput),
        ])
    }

    pub fn with_permission_granted(self) -> Self {
        self.granted.store(true, Ordering::SeqCst);
        self
    }

    pub fn without_output_selection(mut self) -> Self {
        self.output_selection = false;
        self
    }

    pub fn set_deny(&self, deny: bool) {
        self.deny.store(deny, Ordering::SeqCst);
    }

    pub async fn sink(&self) -> Option<String> {
        self.sink.lock().await.clone()
    }

    fn open(
        &self,
        kind: MediaKind,
        constraints: &TrackConstraints,
    ) -> Result<LocalTrack, StudioError> {
        let device_kind = match kind {
            MediaKind::Audio => DeviceKind::AudioInput,
            MediaKind::Video => DeviceKind::VideoInput,
        };
        let mut candidates = self.devices.iter().filter(|d| d.kind == device_kind);

        let device = match constraints.device_id.as_deref() {
            Some(id) => candidates
                .find(|d| d.device_id == id)
                .ok_or_else(|| StudioError::Device(format!("no {kind} device '{id}'")))?,
            None => candidates
                .next()
                .ok_or_else(|| StudioError::Device(format!("no {kind} device present")))?,
        };

        debug!(
            "Opening {} ({}) at {:?}",
            device.device_id, device.label, constraints.resolution
        );
        Ok(LocalTrack::new(kind, &device.device_id, &device.label))
    }
}

#[async_trait]
impl MediaDevices for SyntheticDevices {
    async fn enumerate_devices(&self) -> Result<Vec<DeviceInfo>, StudioError> {
        let granted = self.granted.load(Ordering::SeqCst);
        Ok(self
            .devices
            .iter()
            .map(|d| DeviceInfo {
                label: if granted { d.label.clone() } else { String::new() },
                ..d.clone()
            })
            .collect())
    }

    async fn get_user_media(
        &self,
        constraints: MediaConstraints,
    ) -> Result<Vec<LocalTrack>, StudioError> {
        if self.deny.load(Ordering::SeqCst) {
            return Err(StudioError::Permission("user dismissed the prompt".into()));
        }

        let mut tracks = Vec::new();
        if let Some(audio) = &constraints.audio {
            tracks.push(self.open(MediaKind::Audio, audio)?);
        }
        if let Some(video) = &constraints.video {
            tracks.push(self.open(MediaKind::Video, video)?);
        }

        self.granted.store(true, Ordering::SeqCst);
        Ok(tracks)
    }

    async fn set_sink_id(&self, device_id: &str) -> Result<(), StudioError> {
        if !self.output_selection {
            return Err(StudioError::Unsupported("audio output selection"));
        }
        let known = self
            .devices
            .iter()
            .any(|d| d.kind == DeviceKind::AudioOutput && d.device_id == device_id);
        if !known {
            return Err(StudioError::Device(format!("no output device '{device_id}'")));
        }
        *self.sink.lock().await = Some(device_id.to_owned());
        Ok(())
    }

    fn supports_output_selection(&self) -> bool {
        self.output_selection
    }
}
