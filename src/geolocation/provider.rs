use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// Host provider backed by satellite positioning.
pub static GPS_PROVIDER: &str = "gps";
/// Host provider backed by cell towers and wifi.
pub static NETWORK_PROVIDER: &str = "network";

/// Source of location fixes, ordered from least to most trusted.
///
/// The order matters: [`Location::is_better_than`](super::Location::is_better_than)
/// lets a fix from a higher ranked provider stay current for longer.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provider {
    Unknown,
    Ip,
    PhoneCell,
    Satellite,
    Manual,
}

impl Provider {
    pub fn rank(self) -> i32 {
        match self {
            Self::Unknown => 1,
            Self::Ip => 2,
            Self::PhoneCell => 3,
            Self::Satellite => 4,
            Self::Manual => 5,
        }
    }

    /// Maps a host provider name onto a provider kind.
    pub fn from_host_name(name: &str) -> Self {
        if name == NETWORK_PROVIDER {
            Self::Ip
        } else if name == GPS_PROVIDER {
            Self::Satellite
        } else {
            log::error!("unexpected host provider name {:?}", name);
            Self::Unknown
        }
    }

    /// The host provider that serves this kind, if there is one.
    pub fn host_name(self) -> Option<&'static str> {
        match self {
            Self::Ip => Some(NETWORK_PROVIDER),
            Self::Satellite => Some(GPS_PROVIDER),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Ip => "ip",
            Self::PhoneCell => "phone-cell",
            Self::Satellite => "satellite",
            Self::Manual => "manual",
        }
    }
}

impl Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderStatus {
    Enabled,
    NotAllowed,
    Disabled,
}

impl Display for ProviderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enabled => write!(f, "enabled"),
            Self::NotAllowed => write!(f, "not allowed"),
            Self::Disabled => write!(f, "disabled"),
        }
    }
}
