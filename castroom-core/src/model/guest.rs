use crate::model::participant::ParticipantId;
use crate::model::room::RoomId;
use serde::{Deserialize, Serialize};

/// Guest record as returned by the guest-by-episode endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guest {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
}

/// A guest asking to move from the greenroom into the studio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinRequest {
    pub guest_id: ParticipantId,
    pub guest_name: String,
    pub episode_id: String,
    pub room: RoomId,
}
