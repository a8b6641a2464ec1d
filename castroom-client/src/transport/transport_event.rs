use castroom_core::{IceCandidate, MediaKind, ParticipantId};
use std::fmt;

/// Identifies one concrete connection object. A participant gets a new serial
/// every time its connection is replaced, so late events from a replaced
/// connection can be told apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionKey {
    pub participant: ParticipantId,
    pub serial: u64,
}

impl fmt::Display for ConnectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.participant, self.serial)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalingState {
    Stable,
    HaveLocalOffer,
    HaveRemoteOffer,
    HaveLocalPranswer,
    HaveRemotePranswer,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerConnectionState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

/// Inbound media announced by a peer connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTrack {
    pub kind: MediaKind,
    pub track_id: String,
    pub stream_id: String,
}

/// Events a transport pushes into the session loop.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// Local ICE candidate that has to reach the remote peer.
    CandidateGenerated(ConnectionKey, IceCandidate),

    /// Remote side started sending a track.
    TrackReceived(ConnectionKey, RemoteTrack),

    StateChanged(ConnectionKey, PeerConnectionState),

    SignalingStateChanged(ConnectionKey, SignalingState),
}

impl TransportEvent {
    pub fn key(&self) -> &ConnectionKey {
        match self {
            Self::CandidateGenerated(key, _)
            | Self::TrackReceived(key, _)
            | Self::StateChanged(key, _)
            | Self::SignalingStateChanged(key, _) => key,
        }
    }
}
