mod candidate_queue;
mod connection_phase;
mod coordinator;
mod signaling_channel;
mod socket_bridge;

pub use candidate_queue::*;
pub use connection_phase::*;
pub use coordinator::*;
pub use signaling_channel::*;
pub use socket_bridge::*;
