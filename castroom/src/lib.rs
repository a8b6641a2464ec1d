pub use castroom_core::{ParticipantId, StudioError};

pub mod model {
    pub use castroom_core::model::*;
}

pub mod utils {
    pub use castroom_core::utils::*;
}

#[cfg(feature = "client")]
pub mod client {
    pub use castroom_client::*;
}
