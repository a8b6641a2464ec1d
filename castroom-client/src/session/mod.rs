mod join_flow;
mod join_requests;
mod roster;
mod session;
mod session_command;
mod session_handle;

pub use join_requests::*;
pub use roster::*;
pub use session::*;
pub use session_command::*;
pub use session_handle::*;
