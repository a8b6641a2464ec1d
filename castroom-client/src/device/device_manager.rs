use crate::config::DeviceConfig;
use crate::device::local_stream::{LocalMediaStream, LocalTrack};
use crate::device::media_devices::{MediaConstraints, MediaDevices, TrackConstraints};
use castroom_core::{DeviceInfo, DeviceKind, MediaKind, Role, StudioError, VideoQuality};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Device lists after enumeration, grouped by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceInventory {
    pub video_inputs: Vec<DeviceInfo>,
    pub audio_inputs: Vec<DeviceInfo>,
    pub audio_outputs: Vec<DeviceInfo>,
}

impl DeviceInventory {
    fn from_devices(devices: Vec<DeviceInfo>) -> Self {
        let mut inventory = Self::default();
        for device in devices {
            match device.kind {
                DeviceKind::VideoInput => inventory.video_inputs.push(device),
                DeviceKind::AudioInput => inventory.audio_inputs.push(device),
                DeviceKind::AudioOutput => inventory.audio_outputs.push(device),
            }
        }
        inventory
    }

    pub fn video_available(&self) -> bool {
        !self.video_inputs.is_empty()
    }

    pub fn audio_available(&self) -> bool {
        !self.audio_inputs.is_empty()
    }
}

/// Emitted whenever the camera or microphone actually flips between live and not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaStateChange {
    pub kind: MediaKind,
    pub active: bool,
}

/// Outcome of an output-device switch. Never an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputSelection {
    Applied(String),
    Unsupported,
    Failed(String),
}

/// Owns the local stream and every capture track in it.
pub struct DeviceManager {
    backend: Arc<dyn MediaDevices>,
    config: DeviceConfig,
    role: Role,
    stream: LocalMediaStream,
    inventory: DeviceInventory,
    selected_camera: Option<String>,
    selected_microphone: Option<String>,
    selected_speaker: Option<String>,
    quality: Option<VideoQuality>,
    state_tx: mpsc::UnboundedSender<MediaStateChange>,
}

impl DeviceManager {
    pub fn new(
        backend: Arc<dyn MediaDevices>,
        config: DeviceConfig,
        role: Role,
    ) -> (Self, mpsc::UnboundedReceiver<MediaStateChange>) {
        let (state_tx, state_rx) = mpsc::unbounded_channel();
        let quality = config.video_quality;

        let manager = Self {
            backend,
            config,
            role,
            stream: LocalMediaStream::new(),
            inventory: DeviceInventory::default(),
            selected_camera: None,
            selected_microphone: None,
            selected_speaker: None,
            quality,
            state_tx,
        };
        (manager, state_rx)
    }

    /// Enumerate devices and fill the three lists.
    ///
    /// Fails with [`StudioError::Permission`] when labels are hidden. A missing
    /// camera only degrades video; a missing microphone is re-checked a bounded
    /// number of times before giving up.
    pub async fn enumerate_and_populate(&mut self) -> Result<DeviceInventory, StudioError> {
        let mut devices = self.backend.enumerate_devices().await?;

        if !devices.is_empty() && devices.iter().all(|d| d.label.is_empty()) {
            return Err(StudioError::Permission(
                "device labels are unavailable until media access is granted".into(),
            ));
        }

        let retry = self.config.microphone_retry;
        let mut attempt = 0;
        while !has_kind(&devices, DeviceKind::AudioInput) && attempt < retry.attempts {
            attempt += 1;
            warn!(
                "No microphone found, retrying enumeration ({}/{})",
                attempt, retry.attempts
            );
            tokio::time::sleep(retry.delay()).await;
            devices = self.backend.enumerate_devices().await?;
        }

        let inventory = DeviceInventory::from_devices(devices);

        if !inventory.video_available() {
            warn!("No camera found; video is disabled for this session");
        }
        if !inventory.audio_available() {
            warn!("No microphone found after {} retries", retry.attempts);
        }

        self.selected_camera = pick(&inventory.video_inputs, self.selected_camera.take());
        self.selected_microphone = pick(&inventory.audio_inputs, self.selected_microphone.take());
        self.selected_speaker = pick(&inventory.audio_outputs, self.selected_speaker.take());

        info!(
            "Devices: {} cameras, {} microphones, {} speakers",
            inventory.video_inputs.len(),
            inventory.audio_inputs.len(),
            inventory.audio_outputs.len()
        );

        self.inventory = inventory.clone();
        Ok(inventory)
    }

    /// Replace the video track. Audio on the stream is left untouched.
    pub async fn start_camera(&mut self, device_id: Option<&str>) -> Result<(), StudioError> {
        if !self.config.origin.is_secure() {
            return Err(StudioError::Security(format!(
                "camera access requires HTTPS or localhost, page is served from {}://{}",
                self.config.origin.scheme, self.config.origin.host
            )));
        }

        let was_active = self.camera_active();
        for track in self.stream.remove_kind(MediaKind::Video) {
            debug!("Stopping video track {}", track.id());
            track.stop();
        }

        let device_id = device_id
            .map(str::to_owned)
            .or_else(|| self.selected_camera.clone());
        let resolution = match (self.role, self.quality) {
            (Role::Host, Some(quality)) => Some(quality.resolution()),
            _ => None,
        };
        let constraints = MediaConstraints::video(TrackConstraints {
            device_id,
            resolution,
        });

        let result = self.acquire(MediaKind::Video, constraints).await;
        self.notify_if_changed(MediaKind::Video, was_active);
        let track = result?;

        info!("Camera started on {}", track.device_id());
        self.selected_camera = Some(track.device_id().to_owned());
        Ok(())
    }

    /// Replace the audio track. Video on the stream is left untouched.
    pub async fn start_microphone(&mut self, device_id: Option<&str>) -> Result<(), StudioError> {
        let was_active = self.mic_active();
        for track in self.stream.remove_kind(MediaKind::Audio) {
            debug!("Stopping audio track {}", track.id());
            track.stop();
        }

        let device_id = device_id
            .map(str::to_owned)
            .or_else(|| self.selected_microphone.clone());
        let constraints = MediaConstraints::audio(TrackConstraints {
            device_id,
            resolution: None,
        });

        let result = self.acquire(MediaKind::Audio, constraints).await;
        self.notify_if_changed(MediaKind::Audio, was_active);
        let track = result?;

        info!("Microphone started on {}", track.device_id());
        self.selected_microphone = Some(track.device_id().to_owned());
        Ok(())
    }

    async fn acquire(
        &mut self,
        kind: MediaKind,
        constraints: MediaConstraints,
    ) -> Result<LocalTrack, StudioError> {
        let tracks = self
            .backend
            .get_user_media(constraints)
            .await
            .map_err(|e| match e {
                StudioError::Permission(msg) => {
                    StudioError::Device(format!("{kind} permission denied: {msg}"))
                }
                other => other,
            })?;

        let mut acquired = None;
        for track in tracks {
            if track.kind() == kind && acquired.is_none() {
                acquired = Some(track);
            } else {
                track.stop();
            }
        }

        let track = acquired
            .ok_or_else(|| StudioError::Device(format!("no {kind} track was returned")))?;
        self.stream.insert(track.clone());
        Ok(track)
    }

    pub async fn select_camera(&mut self, device_id: &str) -> Result<(), StudioError> {
        self.selected_camera = Some(device_id.to_owned());
        self.start_camera(Some(device_id)).await
    }

    pub async fn select_microphone(&mut self, device_id: &str) -> Result<(), StudioError> {
        self.selected_microphone = Some(device_id.to_owned());
        self.start_microphone(Some(device_id)).await
    }

    /// Flip the camera in place, or acquire it on the selected device.
    /// Returns whether the camera is live afterwards.
    pub async fn toggle_camera(&mut self) -> Result<bool, StudioError> {
        self.toggle(MediaKind::Video).await
    }

    pub async fn toggle_microphone(&mut self) -> Result<bool, StudioError> {
        self.toggle(MediaKind::Audio).await
    }

    async fn toggle(&mut self, kind: MediaKind) -> Result<bool, StudioError> {
        let existing = self
            .stream
            .track(kind)
            .filter(|t| !t.is_stopped())
            .cloned();

        match existing {
            Some(track) => {
                let was_active = track.is_live();
                track.set_enabled(!track.is_enabled());
                self.notify_if_changed(kind, was_active);
            }
            None => match kind {
                MediaKind::Video => self.start_camera(None).await?,
                MediaKind::Audio => self.start_microphone(None).await?,
            },
        }

        Ok(self.is_active(kind))
    }

    /// Change the host recording quality; a live camera is restarted with it.
    pub async fn set_video_quality(&mut self, quality: VideoQuality) -> Result<(), StudioError> {
        self.quality = Some(quality);
        if self.role == Role::Host && self.camera_active() {
            let device_id = self.selected_camera.clone();
            self.start_camera(device_id.as_deref()).await?;
        }
        Ok(())
    }

    pub async fn set_audio_output(&mut self, device_id: &str) -> OutputSelection {
        if !self.backend.supports_output_selection() {
            return OutputSelection::Unsupported;
        }

        match self.backend.set_sink_id(device_id).await {
            Ok(()) => {
                self.selected_speaker = Some(device_id.to_owned());
                OutputSelection::Applied(device_id.to_owned())
            }
            Err(StudioError::Unsupported(_)) => OutputSelection::Unsupported,
            Err(e) => {
                warn!("Failed to switch audio output to {}: {}", device_id, e);
                OutputSelection::Failed(e.to_string())
            }
        }
    }

    /// Stop every local track. Used when leaving the session.
    pub fn stop_all(&mut self) {
        let camera = self.camera_active();
        let mic = self.mic_active();

        for track in self.stream.take_all() {
            track.stop();
        }

        self.notify_if_changed(MediaKind::Video, camera);
        self.notify_if_changed(MediaKind::Audio, mic);
    }

    fn notify_if_changed(&self, kind: MediaKind, before: bool) {
        let active = self.is_active(kind);
        if active != before {
            let _ = self.state_tx.send(MediaStateChange { kind, active });
        }
    }

    fn is_active(&self, kind: MediaKind) -> bool {
        self.stream.track(kind).is_some_and(|t| t.is_live())
    }

    pub fn camera_active(&self) -> bool {
        self.is_active(MediaKind::Video)
    }

    pub fn mic_active(&self) -> bool {
        self.is_active(MediaKind::Audio)
    }

    pub fn local_stream(&self) -> &LocalMediaStream {
        &self.stream
    }

    pub fn inventory(&self) -> &DeviceInventory {
        &self.inventory
    }

    pub fn selected_camera(&self) -> Option<&str> {
        self.selected_camera.as_deref()
    }

    pub fn selected_microphone(&self) -> Option<&str> {
        self.selected_microphone.as_deref()
    }

    pub fn selected_speaker(&self) -> Option<&str> {
        self.selected_speaker.as_deref()
    }

    pub fn video_quality(&self) -> Option<VideoQuality> {
        self.quality
    }
}

fn has_kind(devices: &[DeviceInfo], kind: DeviceKind) -> bool {
    devices.iter().any(|d| d.kind == kind)
}

/// Keep the current selection if it is still listed, otherwise take the first device.
fn pick(devices: &[DeviceInfo], current: Option<String>) -> Option<String> {
    match current {
        Some(id) if devices.iter().any(|d| d.device_id == id) => Some(id),
        _ => devices.first().map(|d| d.device_id.clone()),
    }
}
