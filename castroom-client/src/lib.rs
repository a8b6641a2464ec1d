mod config;
mod device;
mod directory;
mod session;
mod signaling;
mod transport;
mod updates;

pub use config::*;
pub use device::*;
pub use directory::*;
pub use session::*;
pub use signaling::*;
pub use transport::*;
pub use updates::*;
