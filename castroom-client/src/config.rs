use crate::transport::TransportConfig;
use castroom_core::utils::{DEFAULT_TURN_CREDENTIAL, DEFAULT_TURN_USERNAME, default_ice_servers};
use castroom_core::{IceServerConfig, VideoQuality};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Where the session UI is served from. Camera access needs a secure one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origin {
    pub scheme: String,
    pub host: String,
}

impl Origin {
    pub fn new(scheme: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            host: host.into(),
        }
    }

    pub fn is_secure(&self) -> bool {
        if self.scheme.eq_ignore_ascii_case("https") {
            return true;
        }
        let host = self.host.split(':').next().unwrap_or_default();
        matches!(host, "localhost" | "127.0.0.1") || self.host.starts_with("[::1]")
    }
}

impl Default for Origin {
    fn default() -> Self {
        Self::new("https", "localhost")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay_ms: u64,
}

impl RetryPolicy {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub origin: Origin,
    /// Extra enumeration rounds while no microphone shows up.
    pub microphone_retry: RetryPolicy,
    /// Initial recording quality. Only applied to the host's camera.
    pub video_quality: Option<VideoQuality>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            origin: Origin::default(),
            microphone_retry: RetryPolicy::default(),
            video_quality: Some(VideoQuality::Hd),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JoinConfig {
    pub ack_timeout_ms: u64,
    pub request_expiry_ms: u64,
}

impl JoinConfig {
    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }

    pub fn request_expiry(&self) -> Duration {
        Duration::from_millis(self.request_expiry_ms)
    }
}

impl Default for JoinConfig {
    fn default() -> Self {
        Self {
            ack_timeout_ms: 10_000,
            request_expiry_ms: 120_000,
        }
    }
}

/// Top-level settings for a studio session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioConfig {
    pub ice_servers: Vec<IceServerConfig>,
    pub device: DeviceConfig,
    pub join: JoinConfig,
    /// Base URL of the guest API. No lookups happen without it.
    pub api_base: Option<String>,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            ice_servers: default_ice_servers(),
            device: DeviceConfig::default(),
            join: JoinConfig::default(),
            api_base: None,
        }
    }
}

impl StudioConfig {
    /// Defaults overridden by `CASTROOM_*` environment variables.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        let stun = var("CASTROOM_STUN_URL");
        let turn = var("CASTROOM_TURN_URL");

        if stun.is_some() || turn.is_some() {
            let defaults = default_ice_servers();
            let mut servers = Vec::new();

            match stun {
                Some(url) => servers.push(IceServerConfig {
                    urls: vec![url],
                    username: None,
                    credential: None,
                }),
                None => servers.extend(defaults.iter().filter(|s| s.username.is_none()).cloned()),
            }

            match turn {
                Some(url) => servers.push(IceServerConfig {
                    urls: vec![url],
                    username: Some(
                        var("CASTROOM_TURN_USERNAME")
                            .unwrap_or_else(|| DEFAULT_TURN_USERNAME.to_owned()),
                    ),
                    credential: Some(
                        var("CASTROOM_TURN_CREDENTIAL")
                            .unwrap_or_else(|| DEFAULT_TURN_CREDENTIAL.to_owned()),
                    ),
                }),
                None => servers.extend(defaults.into_iter().filter(|s| s.username.is_some())),
            }

            self.ice_servers = servers;
        }

        if let Some(base) = var("CASTROOM_API_BASE") {
            self.api_base = Some(base.trim_end_matches('/').to_owned());
        }

        self
    }

    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            ice_servers: self.ice_servers.clone(),
        }
    }
}
