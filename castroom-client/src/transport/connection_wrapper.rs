use crate::device::LocalTrack;
use crate::transport::peer_transport::{PeerTransport, PeerTransportFactory};
use crate::transport::transport_config::TransportConfig;
use crate::transport::transport_event::{
    ConnectionKey, PeerConnectionState, RemoteTrack, SignalingState, TransportEvent,
};
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use castroom_core::{IceCandidate, MediaKind, SdpType, SessionDescription};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::signaling_state::RTCSignalingState;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::rtp_transceiver::rtp_sender::RTCRtpSender;

/// Builds webrtc-rs backed transports.
#[derive(Clone, Default)]
pub struct RtcTransportFactory {
    config: TransportConfig,
}

impl RtcTransportFactory {
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl PeerTransportFactory for RtcTransportFactory {
    async fn create(
        &self,
        key: ConnectionKey,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<Box<dyn PeerTransport>> {
        let transport = RtcTransport::new(key, self.config.clone(), events).await?;
        Ok(Box::new(transport))
    }
}

pub struct RtcTransport {
    key: ConnectionKey,
    peer_connection: Arc<RTCPeerConnection>,
    senders: Mutex<HashMap<MediaKind, Arc<RTCRtpSender>>>,
}

impl RtcTransport {
    /// Create the peer connection and route its callbacks into `event_tx`.
    pub async fn new(
        key: ConnectionKey,
        config: TransportConfig,
        event_tx: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<Self> {
        let mut m = MediaEngine::default();
        m.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut m)?;

        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: config
                .ice_servers
                .iter()
                .map(|server| RTCIceServer {
                    urls: server.urls.clone(),
                    username: server.username.clone().unwrap_or_default(),
                    credential: server.credential.clone().unwrap_or_default(),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        };

        let peer_connection = Arc::new(
            api.new_peer_connection(rtc_config)
                .await
                .context("Failed to create peer connection")?,
        );

        let state_tx = event_tx.clone();
        let state_key = key.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                let tx = state_tx.clone();
                let key = state_key.clone();

                Box::pin(async move {
                    info!("Peer connection state for {}: {}", key, s);
                    let Some(state) = map_connection_state(s) else {
                        return;
                    };
                    let _ = tx.send(TransportEvent::StateChanged(key, state));
                })
            },
        ));

        let sig_tx = event_tx.clone();
        let sig_key = key.clone();
        peer_connection.on_signaling_state_change(Box::new(move |s: RTCSignalingState| {
            let tx = sig_tx.clone();
            let key = sig_key.clone();

            Box::pin(async move {
                debug!("Signaling state for {}: {}", key, s);
                let Some(state) = map_signaling_state(s) else {
                    return;
                };
                let _ = tx.send(TransportEvent::SignalingStateChanged(key, state));
            })
        }));

        let ice_tx = event_tx.clone();
        let ice_key = key.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();
            let key = ice_key.clone();

            Box::pin(async move {
                let Some(candidate) = c else { return };
                let Ok(init) = candidate.to_json() else {
                    return;
                };
                let candidate = IceCandidate {
                    candidate: init.candidate,
                    sdp_mid: init.sdp_mid,
                    sdp_m_line_index: init.sdp_mline_index,
                    username_fragment: init.username_fragment,
                };
                let _ = tx.send(TransportEvent::CandidateGenerated(key, candidate));
            })
        }));

        let track_tx = event_tx.clone();
        let track_key = key.clone();
        peer_connection.on_track(Box::new(move |track, _receiver, _transceiver| {
            let tx = track_tx.clone();
            let key = track_key.clone();

            Box::pin(async move {
                let kind = match track.kind() {
                    RTPCodecType::Audio => MediaKind::Audio,
                    RTPCodecType::Video => MediaKind::Video,
                    other => {
                        warn!("Ignoring track of kind {} from {}", other, key);
                        return;
                    }
                };
                let remote = RemoteTrack {
                    kind,
                    track_id: track.id(),
                    stream_id: track.stream_id(),
                };

                // The read loop runs on its own task so the handler returns and
                // later tracks can still fire.
                let reader_key = key.clone();
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 1500];
                    let mut packets = 0u64;
                    while track.read(&mut buf).await.is_ok() {
                        packets += 1;
                        if packets % 500 == 0 {
                            debug!("{} {} packets from {}", packets, kind, reader_key);
                        }
                    }
                    debug!("Remote {} track from {} ended", kind, reader_key);
                });

                let _ = tx.send(TransportEvent::TrackReceived(key, remote));
            })
        }));

        Ok(Self {
            key,
            peer_connection,
            senders: Mutex::new(HashMap::new()),
        })
    }
}

#[async_trait]
impl PeerTransport for RtcTransport {
    fn key(&self) -> &ConnectionKey {
        &self.key
    }

    async fn add_local_track(&self, track: &LocalTrack) -> Result<()> {
        let sender = self
            .peer_connection
            .add_track(track.rtc_track())
            .await
            .with_context(|| format!("Failed to add {} track", track.kind()))?;

        // RTCP has to be read for interceptors to work.
        let rtcp_sender = Arc::clone(&sender);
        tokio::spawn(async move {
            let mut rtcp_buf = vec![0u8; 1500];
            while rtcp_sender.read(&mut rtcp_buf).await.is_ok() {}
        });

        self.senders.lock().await.insert(track.kind(), sender);
        Ok(())
    }

    async fn replace_local_track(&self, track: &LocalTrack) -> Result<()> {
        let sender = self.senders.lock().await.get(&track.kind()).cloned();
        match sender {
            Some(sender) => sender
                .replace_track(Some(track.rtc_track()))
                .await
                .with_context(|| format!("Failed to replace {} track", track.kind())),
            None => {
                warn!(
                    "No {} sender on {}; adding track without renegotiation",
                    track.kind(),
                    self.key
                );
                self.add_local_track(track).await
            }
        }
    }

    async fn create_offer(&self) -> Result<SessionDescription> {
        let offer = self.peer_connection.create_offer(None).await?;
        self.peer_connection
            .set_local_description(offer.clone())
            .await
            .context("Failed to set local offer")?;
        Ok(SessionDescription::offer(offer.sdp))
    }

    async fn create_answer(&self) -> Result<SessionDescription> {
        let answer = self.peer_connection.create_answer(None).await?;
        self.peer_connection
            .set_local_description(answer.clone())
            .await
            .context("Failed to set local answer")?;
        Ok(SessionDescription::answer(answer.sdp))
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()> {
        let desc = match desc.sdp_type {
            SdpType::Offer => RTCSessionDescription::offer(desc.sdp)?,
            SdpType::Answer => RTCSessionDescription::answer(desc.sdp)?,
            SdpType::Pranswer => RTCSessionDescription::pranswer(desc.sdp)?,
            SdpType::Rollback => bail!("Rollback descriptions are not supported"),
        };
        self.peer_connection.set_remote_description(desc).await?;
        Ok(())
    }

    async fn has_remote_description(&self) -> bool {
        self.peer_connection.remote_description().await.is_some()
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_m_line_index,
            username_fragment: candidate.username_fragment,
        };
        self.peer_connection
            .add_ice_candidate(init)
            .await
            .context("Failed to add ICE candidate")?;
        Ok(())
    }

    fn signaling_state(&self) -> SignalingState {
        map_signaling_state(self.peer_connection.signaling_state()).unwrap_or(SignalingState::Stable)
    }

    async fn close(&self) -> Result<()> {
        self.peer_connection.close().await?;
        Ok(())
    }
}

fn map_signaling_state(state: RTCSignalingState) -> Option<SignalingState> {
    match state {
        RTCSignalingState::Stable => Some(SignalingState::Stable),
        RTCSignalingState::HaveLocalOffer => Some(SignalingState::HaveLocalOffer),
        RTCSignalingState::HaveRemoteOffer => Some(SignalingState::HaveRemoteOffer),
        RTCSignalingState::HaveLocalPranswer => Some(SignalingState::HaveLocalPranswer),
        RTCSignalingState::HaveRemotePranswer => Some(SignalingState::HaveRemotePranswer),
        RTCSignalingState::Closed => Some(SignalingState::Closed),
        _ => None,
    }
}

fn map_connection_state(state: RTCPeerConnectionState) -> Option<PeerConnectionState> {
    match state {
        RTCPeerConnectionState::New => Some(PeerConnectionState::New),
        RTCPeerConnectionState::Connecting => Some(PeerConnectionState::Connecting),
        RTCPeerConnectionState::Connected => Some(PeerConnectionState::Connected),
        RTCPeerConnectionState::Disconnected => Some(PeerConnectionState::Disconnected),
        RTCPeerConnectionState::Failed => Some(PeerConnectionState::Failed),
        RTCPeerConnectionState::Closed => Some(PeerConnectionState::Closed),
        _ => None,
    }
}
