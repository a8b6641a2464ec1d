mod device;
mod guest;
mod participant;
mod room;
mod session_description;
mod signaling;

pub use device::{DeviceInfo, DeviceKind, MediaKind, Resolution, VideoQuality};
pub use guest::{Guest, JoinRequest};
pub use participant::{HOST_MARKER, Participant, ParticipantId, ParticipantStatus, Role};
pub use room::RoomId;
pub use session_description::{IceCandidate, SdpType, SessionDescription};
pub use signaling::{
    AnswerMessage, ApproveJoinStudio, DenyJoinStudio, GreenroomUser, GreenroomUsers,
    IceCandidateMessage, IceServerConfig, JoinDecision, JoinStudioRequest, OfferMessage, RoomRef,
    Routed, SignalEvent, StreamState, UserJoined, UserLeft,
};
