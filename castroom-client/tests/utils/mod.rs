pub mod mock_signaling;

pub use mock_signaling::*;
pub use mock_transport::*;
pub use scripted_devices::*;
pub use slow_directory::*;
pub use wait_helpers::*;
