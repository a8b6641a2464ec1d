mod device_manager;
mod local_stream;
mod media_devices;
mod synthetic_devices;

pub use device_manager::*;
pub use local_stream::*;
pub use media_devices::*;
pub use synthetic_devices::*;
