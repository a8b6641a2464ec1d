mod guest_directory;
mod http_guest_directory;
mod static_guest_directory;

pub use guest_directory::*;
pub use http_guest_directory::*;
pub use static_guest_directory::*;
