use crate::error::StudioError;
use crate::model::participant::{ParticipantId, Role};
use crate::model::room::RoomId;
use crate::model::session_description::{IceCandidate, SessionDescription};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
}

/// Socket channel events. Serialized as `{"event": "<name>", "data": {..}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum SignalEvent {
    JoinGreenroom(RoomRef),
    RequestJoinStudio(JoinStudioRequest),
    ApproveJoinStudio(ApproveJoinStudio),
    DenyJoinStudio(DenyJoinStudio),
    Offer(OfferMessage),
    Answer(AnswerMessage),
    IceCandidate(IceCandidateMessage),
    UpdateStreamState(StreamState),
    JoinStudioApproved(JoinDecision),
    JoinStudioDenied(JoinDecision),
    UserJoined(UserJoined),
    UserLeft(UserLeft),
    GreenroomUsers(GreenroomUsers),
}

impl SignalEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::JoinGreenroom(_) => "join_greenroom",
            Self::RequestJoinStudio(_) => "request_join_studio",
            Self::ApproveJoinStudio(_) => "approve_join_studio",
            Self::DenyJoinStudio(_) => "deny_join_studio",
            Self::Offer(_) => "offer",
            Self::Answer(_) => "answer",
            Self::IceCandidate(_) => "ice_candidate",
            Self::UpdateStreamState(_) => "update_stream_state",
            Self::JoinStudioApproved(_) => "join_studio_approved",
            Self::JoinStudioDenied(_) => "join_studio_denied",
            Self::UserJoined(_) => "user_joined",
            Self::UserLeft(_) => "user_left",
            Self::GreenroomUsers(_) => "greenroom_users",
        }
    }

    pub fn from_json(text: &str) -> Result<Self, StudioError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String, StudioError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomRef {
    pub room: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinStudioRequest {
    pub room: String,
    pub episode_id: String,
    pub guest_id: String,
    pub guest_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveJoinStudio {
    pub guest_id: String,
    pub episode_id: String,
    pub room: String,
    pub guest_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DenyJoinStudio {
    pub guest_id: String,
    pub reason: String,
    pub room: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamState {
    pub room: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_camera_active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_mic_active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinDecision {
    pub episode_id: String,
    pub guest_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserJoined {
    pub room: String,
    pub user_id: String,
    pub user_name: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserLeft {
    pub room: String,
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GreenroomUser {
    pub user_id: String,
    pub user_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GreenroomUsers {
    pub room: String,
    pub users: Vec<GreenroomUser>,
}

/// A negotiation payload whose routing fields were all present.
#[derive(Debug, Clone, PartialEq)]
pub struct Routed<T> {
    pub room: RoomId,
    pub target: ParticipantId,
    pub from: ParticipantId,
    pub payload: T,
}

// Negotiation payloads keep every field optional so a malformed message still
// parses and can be rejected field by field.

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offer: Option<SessionDescription>,
}

impl OfferMessage {
    pub fn new(
        room: &RoomId,
        target: &ParticipantId,
        from: &ParticipantId,
        offer: SessionDescription,
    ) -> Self {
        Self {
            room: Some(room.to_string()),
            target_user_id: Some(target.to_string()),
            from_user_id: Some(from.to_string()),
            offer: Some(offer),
        }
    }

    pub fn validate(self) -> Result<Routed<SessionDescription>, StudioError> {
        routed(
            "offer",
            self.room,
            self.target_user_id,
            self.from_user_id,
            ("offer", self.offer),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<SessionDescription>,
}

impl AnswerMessage {
    pub fn new(
        room: &RoomId,
        target: &ParticipantId,
        from: &ParticipantId,
        answer: SessionDescription,
    ) -> Self {
        Self {
            room: Some(room.to_string()),
            target_user_id: Some(target.to_string()),
            from_user_id: Some(from.to_string()),
            answer: Some(answer),
        }
    }

    pub fn validate(self) -> Result<Routed<SessionDescription>, StudioError> {
        routed(
            "answer",
            self.room,
            self.target_user_id,
            self.from_user_id,
            ("answer", self.answer),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidateMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidate: Option<IceCandidate>,
}

impl IceCandidateMessage {
    pub fn new(
        room: &RoomId,
        target: &ParticipantId,
        from: &ParticipantId,
        candidate: IceCandidate,
    ) -> Self {
        Self {
            room: Some(room.to_string()),
            target_user_id: Some(target.to_string()),
            from_user_id: Some(from.to_string()),
            candidate: Some(candidate),
        }
    }

    pub fn validate(self) -> Result<Routed<IceCandidate>, StudioError> {
        routed(
            "ice_candidate",
            self.room,
            self.target_user_id,
            self.from_user_id,
            ("candidate", self.candidate),
        )
    }
}

fn routed<T>(
    event: &'static str,
    room: Option<String>,
    target: Option<String>,
    from: Option<String>,
    (payload_field, payload): (&'static str, Option<T>),
) -> Result<Routed<T>, StudioError> {
    let room = require_str(event, "room", room)?;
    let target = require_str(event, "targetUserId", target)?;
    let from = require_str(event, "fromUserId", from)?;
    let payload = payload.ok_or(StudioError::SignalingValidation {
        event,
        field: payload_field,
    })?;

    Ok(Routed {
        room: RoomId(room),
        target: ParticipantId(target),
        from: ParticipantId(from),
        payload,
    })
}

fn require_str(
    event: &'static str,
    field: &'static str,
    value: Option<String>,
) -> Result<String, StudioError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(StudioError::SignalingValidation { event, field }),
    }
}
