use crate::device::LocalTrack;
use crate::transport::transport_event::{ConnectionKey, SignalingState, TransportEvent};
use anyhow::Result;
use async_trait::async_trait;
use castroom_core::{IceCandidate, SessionDescription};
use tokio::sync::mpsc;

/// One peer connection, seen from the signaling coordinator.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    fn key(&self) -> &ConnectionKey;

    /// Attach a local track. The track stays owned by the device manager.
    async fn add_local_track(&self, track: &LocalTrack) -> Result<()>;

    /// Swap the outgoing track of the same kind without renegotiating.
    async fn replace_local_track(&self, track: &LocalTrack) -> Result<()>;

    /// Create an offer and apply it as the local description.
    async fn create_offer(&self) -> Result<SessionDescription>;

    /// Create an answer and apply it as the local description.
    async fn create_answer(&self) -> Result<SessionDescription>;

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()>;

    async fn has_remote_description(&self) -> bool;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()>;

    fn signaling_state(&self) -> SignalingState;

    async fn close(&self) -> Result<()>;
}

#[async_trait]
pub trait PeerTransportFactory: Send + Sync {
    async fn create(
        &self,
        key: ConnectionKey,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<Box<dyn PeerTransport>>;
}
