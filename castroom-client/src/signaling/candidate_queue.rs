use castroom_core::IceCandidate;
use std::collections::VecDeque;

/// Candidates that arrived before the remote description, in arrival order.
#[derive(Debug, Default)]
pub struct CandidateQueue {
    items: VecDeque<IceCandidate>,
}

impl CandidateQueue {
    pub fn push(&mut self, candidate: IceCandidate) {
        self.items.push_back(candidate);
    }

    /// Take every queued candidate, oldest first.
    pub fn drain(&mut self) -> Vec<IceCandidate> {
        self.items.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
