use castroom_core::IceServerConfig;
use castroom_core::utils::default_ice_servers;

/// ICE configuration handed to every new peer connection.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub ice_servers: Vec<IceServerConfig>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            ice_servers: default_ice_servers(),
        }
    }
}
