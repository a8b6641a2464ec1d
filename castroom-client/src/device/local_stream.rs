use anyhow::Result;
use bytes::Bytes;
use castroom_core::MediaKind;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use uuid::Uuid;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8};
use webrtc::media::Sample;
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

const LOCAL_STREAM_ID: &str = "castroom-local";

struct TrackInner {
    id: String,
    kind: MediaKind,
    device_id: String,
    label: String,
    enabled: AtomicBool,
    stopped: AtomicBool,
    rtc: Arc<TrackLocalStaticSample>,
}

/// Handle to one local capture track.
///
/// Clones share state: every peer connection that carries the track sees the
/// same `enabled` flag, and only the device manager can stop it.
#[derive(Clone)]
pub struct LocalTrack {
    inner: Arc<TrackInner>,
}

impl LocalTrack {
    pub fn new(kind: MediaKind, device_id: impl Into<String>, label: impl Into<String>) -> Self {
        let id = Uuid::new_v4().to_string();
        let codec = match kind {
            MediaKind::Audio => RTCRtpCodecCapability {
                mime_type: MIME_TYPE_OPUS.to_owned(),
                clock_rate: 48000,
                channels: 2,
                ..Default::default()
            },
            MediaKind::Video => RTCRtpCodecCapability {
                mime_type: MIME_TYPE_VP8.to_owned(),
                clock_rate: 90000,
                ..Default::default()
            },
        };
        let rtc = Arc::new(TrackLocalStaticSample::new(
            codec,
            id.clone(),
            LOCAL_STREAM_ID.to_owned(),
        ));

        Self {
            inner: Arc::new(TrackInner {
                id,
                kind,
                device_id: device_id.into(),
                label: label.into(),
                enabled: AtomicBool::new(true),
                stopped: AtomicBool::new(false),
                rtc,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn kind(&self) -> MediaKind {
        self.inner.kind
    }

    pub fn device_id(&self) -> &str {
        &self.inner.device_id
    }

    pub fn label(&self) -> &str {
        &self.inner.label
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::SeqCst)
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::SeqCst)
    }

    /// Live means not stopped and currently enabled.
    pub fn is_live(&self) -> bool {
        !self.is_stopped() && self.is_enabled()
    }

    pub fn rtc_track(&self) -> Arc<dyn TrackLocal + Send + Sync> {
        self.inner.rtc.clone()
    }

    /// Push one encoded frame to every connection carrying this track.
    /// Returns `false` when the frame was dropped because the track is muted or stopped.
    pub async fn write_sample(&self, data: Bytes, duration: Duration) -> Result<bool> {
        if !self.is_live() {
            return Ok(false);
        }
        self.inner
            .rtc
            .write_sample(&Sample {
                data,
                duration,
                ..Default::default()
            })
            .await?;
        Ok(true)
    }

    pub(crate) fn set_enabled(&self, enabled: bool) {
        self.inner.enabled.store(enabled, Ordering::SeqCst);
    }

    pub(crate) fn stop(&self) {
        self.inner.stopped.store(true, Ordering::SeqCst);
    }

    pub fn same_track(&self, other: &LocalTrack) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for LocalTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalTrack")
            .field("id", &self.inner.id)
            .field("kind", &self.inner.kind)
            .field("device_id", &self.inner.device_id)
            .field("enabled", &self.is_enabled())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

/// The local capture stream: at most one track per kind.
#[derive(Debug, Clone)]
pub struct LocalMediaStream {
    id: String,
    tracks: Vec<LocalTrack>,
}

impl LocalMediaStream {
    pub fn new() -> Self {
        Self {
            id: LOCAL_STREAM_ID.to_owned(),
            tracks: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn tracks(&self) -> &[LocalTrack] {
        &self.tracks
    }

    pub fn track(&self, kind: MediaKind) -> Option<&LocalTrack> {
        self.tracks.iter().find(|t| t.kind() == kind)
    }

    pub fn tracks_of(&self, kind: MediaKind) -> usize {
        self.tracks.iter().filter(|t| t.kind() == kind).count()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Add a track, displacing any track of the same kind. Returns the displaced ones.
    pub(crate) fn insert(&mut self, track: LocalTrack) -> Vec<LocalTrack> {
        let displaced = self.remove_kind(track.kind());
        self.tracks.push(track);
        displaced
    }

    pub(crate) fn remove_kind(&mut self, kind: MediaKind) -> Vec<LocalTrack> {
        let (removed, kept) = self.tracks.drain(..).partition(|t| t.kind() == kind);
        self.tracks = kept;
        removed
    }

    pub(crate) fn take_all(&mut self) -> Vec<LocalTrack> {
        std::mem::take(&mut self.tracks)
    }
}

impl Default for LocalMediaStream {
    fn default() -> Self {
        Self::new()
    }
}
