use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Audio => f.write_str("audio"),
            Self::Video => f.write_str("video"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    VideoInput,
    AudioInput,
    AudioOutput,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub device_id: String,
    /// Empty until the platform has granted media permission.
    pub label: String,
    pub kind: DeviceKind,
}

impl DeviceInfo {
    pub fn new(device_id: impl Into<String>, label: impl Into<String>, kind: DeviceKind) -> Self {
        Self {
            device_id: device_id.into(),
            label: label.into(),
            kind,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

/// Host-selectable recording quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VideoQuality {
    #[serde(rename = "1080p")]
    FullHd,
    #[serde(rename = "720p")]
    Hd,
    #[serde(rename = "480p")]
    Sd,
}

impl VideoQuality {
    pub fn resolution(&self) -> Resolution {
        match self {
            Self::FullHd => Resolution {
                width: 1920,
                height: 1080,
            },
            Self::Hd => Resolution {
                width: 1280,
                height: 720,
            },
            Self::Sd => Resolution {
                width: 640,
                height: 480,
            },
        }
    }
}

impl fmt::Display for VideoQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FullHd => f.write_str("1080p"),
            Self::Hd => f.write_str("720p"),
            Self::Sd => f.write_str("480p"),
        }
    }
}

impl FromStr for VideoQuality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1080p" => Ok(Self::FullHd),
            "720p" => Ok(Self::Hd),
            "480p" => Ok(Self::Sd),
            other => Err(format!("unknown video quality '{other}'")),
        }
    }
}
