use crate::updates::ParticipantRow;
use castroom_core::{
    GreenroomUser, Guest, Participant, ParticipantId, ParticipantStatus, Role, StreamState,
};
use std::collections::{BTreeMap, HashSet};

/// Who the local participant knows about: the episode's invited guests, the
/// members connected to the studio socket and the greenroom.
#[derive(Debug, Clone)]
pub struct Roster {
    local_id: ParticipantId,
    episode_guests: Vec<Guest>,
    studio: BTreeMap<ParticipantId, Participant>,
    greenroom: BTreeMap<ParticipantId, String>,
}

impl Roster {
    pub fn new(local_id: ParticipantId) -> Self {
        Self {
            local_id,
            episode_guests: Vec::new(),
            studio: BTreeMap::new(),
            greenroom: BTreeMap::new(),
        }
    }

    pub fn set_episode_guests(&mut self, guests: Vec<Guest>) {
        self.episode_guests = guests;
    }

    pub fn studio_join(&mut self, id: ParticipantId, name: impl Into<String>, role: Role) {
        if id == self.local_id {
            return;
        }
        self.greenroom.remove(&id);
        let mut participant = Participant::new(id.clone(), name, role);
        participant.is_ready = true;
        self.studio.insert(id, participant);
    }

    /// Drop a member from both the studio and the greenroom.
    pub fn remove(&mut self, id: &ParticipantId) -> bool {
        let in_studio = self.studio.remove(id).is_some();
        let in_greenroom = self.greenroom.remove(id).is_some();
        in_studio || in_greenroom
    }

    pub fn set_greenroom(&mut self, users: Vec<GreenroomUser>) {
        self.greenroom = users
            .into_iter()
            .map(|u| (ParticipantId(u.user_id), u.user_name))
            .filter(|(id, _)| *id != self.local_id)
            .collect();
    }

    pub fn apply_stream_state(&mut self, state: &StreamState) {
        let id = ParticipantId::from(state.user_id.as_str());
        let Some(participant) = self.studio.get_mut(&id) else {
            return;
        };
        if let Some(camera) = state.is_camera_active {
            participant.is_camera_active = camera;
        }
        if let Some(mic) = state.is_mic_active {
            participant.is_mic_active = mic;
        }
    }

    pub fn participant(&self, id: &ParticipantId) -> Option<&Participant> {
        self.studio.get(id)
    }

    pub fn studio_members(&self) -> impl Iterator<Item = &Participant> {
        self.studio.values()
    }

    /// Rows for the participant list. Invited guests come first in episode
    /// order, then anyone else present, by id.
    pub fn participant_rows(&self, awaiting: &[ParticipantId]) -> Vec<ParticipantRow> {
        let mut seen = HashSet::new();
        let mut rows = Vec::new();

        for guest in &self.episode_guests {
            let id = ParticipantId(guest.id.clone());
            if seen.insert(id.clone()) {
                rows.push(self.row(id, Some(&guest.name), awaiting));
            }
        }

        let mut others: Vec<ParticipantId> = self
            .studio
            .keys()
            .chain(self.greenroom.keys())
            .chain(awaiting.iter())
            .filter(|id| **id != self.local_id)
            .cloned()
            .collect();
        others.sort();
        for id in others {
            if seen.insert(id.clone()) {
                rows.push(self.row(id, None, awaiting));
            }
        }

        rows
    }

    fn row(
        &self,
        id: ParticipantId,
        invited_name: Option<&String>,
        awaiting: &[ParticipantId],
    ) -> ParticipantRow {
        let studio = self.studio.get(&id);
        let greenroom = self.greenroom.get(&id);

        let status = if studio.is_some() {
            ParticipantStatus::InStudio
        } else if greenroom.is_some() || awaiting.contains(&id) {
            ParticipantStatus::AwaitingApproval
        } else {
            ParticipantStatus::NotConnected
        };

        let name = studio
            .map(|p| &p.name)
            .or(greenroom)
            .or(invited_name)
            .cloned()
            .unwrap_or_else(|| id.to_string());

        ParticipantRow {
            name,
            status,
            is_camera_active: studio.is_some_and(|p| p.is_camera_active),
            is_mic_active: studio.is_some_and(|p| p.is_mic_active),
            id,
        }
    }
}
