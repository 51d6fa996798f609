use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use thiserror::Error;
use zvariant::OwnedObjectPath;

use crate::types::constants::connectivity;

bitflags! {
    /// Security capabilities advertised by an access point.
    ///
    /// Flags are independent: an enterprise network usually carries
    /// `WPA2 | ENTERPRISE`, and a mixed-mode router `WPA | WPA2`. The empty
    /// set means an open network.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Security: u32 {
        /// Legacy WEP, advertised only through the privacy bit.
        const WEP = 0b0001;
        /// WPA (version 1) information element present.
        const WPA = 0b0010;
        /// RSN (WPA2/WPA3) information element present.
        const WPA2 = 0b0100;
        /// 802.1X key management offered.
        const ENTERPRISE = 0b1000;
    }
}

impl Security {
    /// Label of the most significant flag, used for display only.
    ///
    /// Priority is enterprise, then WPA2, WPA, WEP, and finally `"none"`.
    pub fn label(self) -> &'static str {
        if self.contains(Self::ENTERPRISE) {
            "enterprise"
        } else if self.contains(Self::WPA2) {
            "wp2"
        } else if self.contains(Self::WPA) {
            "wpa"
        } else if self.contains(Self::WEP) {
            "wep"
        } else {
            "none"
        }
    }
}

impl Display for Security {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Raw capability words read from an access point object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ApCapabilities {
    /// `Flags` property (`NM80211ApFlags`).
    pub flags: u32,
    /// `WpaFlags` property (`NM80211ApSecurityFlags`).
    pub wpa_flags: u32,
    /// `RsnFlags` property (`NM80211ApSecurityFlags`).
    pub rsn_flags: u32,
}

/// A visible Wi-Fi network as seen by one scan pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPoint {
    /// Network name, never empty.
    pub ssid: String,
    /// NetworkManager object backing this access point.
    pub path: OwnedObjectPath,
    /// Signal strength in percent.
    pub strength: u8,
    /// Classified security capabilities.
    pub security: Security,
}

impl AccessPoint {
    /// Reduces the access point to what the portal UI is allowed to see.
    pub fn summary(&self) -> AccessPointSummary {
        AccessPointSummary {
            ssid: self.ssid.clone(),
            security: self.security.label().to_string(),
        }
    }
}

/// Access point as returned to portal clients.
///
/// Signal strength and the D-Bus handle stay internal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessPointSummary {
    pub ssid: String,
    pub security: String,
}

/// Handles of a profile created with `AddAndActivateConnection`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivatedProfile {
    /// Saved settings object (`Settings/<n>`).
    pub connection: OwnedObjectPath,
    /// Active connection object (`ActiveConnection/<n>`).
    pub active: OwnedObjectPath,
}

/// A saved profile that can be activated on the wireless device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedProfile {
    pub path: OwnedObjectPath,
    /// SSID stored in the `802-11-wireless` section, if any.
    pub ssid: Option<String>,
}

/// Lifecycle of the captive portal access point.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum HotspotState {
    /// No hotspot profile exists.
    #[default]
    Closed,
    /// The hotspot profile is active.
    Created(ActivatedProfile),
}

impl HotspotState {
    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// NetworkManager active connection state.
///
/// These values represent the lifecycle states of an active connection
/// as reported by the NM D-Bus API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveConnectionState {
    /// Connection state is unknown.
    Unknown,
    /// Connection is activating (connecting).
    Activating,
    /// Connection is fully activated (connected).
    Activated,
    /// Connection is deactivating (disconnecting).
    Deactivating,
    /// Connection is fully deactivated (disconnected).
    Deactivated,
    /// Unknown state code not mapped to a specific variant.
    Other(u32),
}

impl From<u32> for ActiveConnectionState {
    fn from(code: u32) -> Self {
        match code {
            0 => Self::Unknown,
            1 => Self::Activating,
            2 => Self::Activated,
            3 => Self::Deactivating,
            4 => Self::Deactivated,
            v => Self::Other(v),
        }
    }
}

impl Display for ActiveConnectionState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Activating => write!(f, "activating"),
            Self::Activated => write!(f, "activated"),
            Self::Deactivating => write!(f, "deactivating"),
            Self::Deactivated => write!(f, "deactivated"),
            Self::Other(v) => write!(f, "unknown state ({v})"),
        }
    }
}

/// NetworkManager's view of internet reachability.
///
/// Distinct from activation: a link can be up while the internet is not
/// reachable through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityState {
    Unknown,
    /// No network connection at all.
    None,
    /// Behind a captive portal.
    Portal,
    /// Connected, but no route to the internet.
    Limited,
    /// Full internet access.
    Full,
    Other(u32),
}

impl ConnectivityState {
    /// Whether the join counts as having connectivity.
    ///
    /// `Limited` is accepted as well: on many networks the NM check endpoint
    /// is blocked while the link works fine.
    pub fn is_established(self) -> bool {
        matches!(self, Self::Limited | Self::Full)
    }
}

impl From<u32> for ConnectivityState {
    fn from(code: u32) -> Self {
        match code {
            connectivity::UNKNOWN => Self::Unknown,
            connectivity::NONE => Self::None,
            connectivity::PORTAL => Self::Portal,
            connectivity::LIMITED => Self::Limited,
            connectivity::FULL => Self::Full,
            v => Self::Other(v),
        }
    }
}

impl Display for ConnectivityState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::None => write!(f, "none"),
            Self::Portal => write!(f, "portal"),
            Self::Limited => write!(f, "limited"),
            Self::Full => write!(f, "full"),
            Self::Other(v) => write!(f, "unknown connectivity ({v})"),
        }
    }
}

/// Errors produced by the provisioning engine.
#[derive(Debug, Error)]
pub enum PortalError {
    /// A D-Bus communication error occurred.
    #[error("D-Bus error: {0}")]
    Dbus(#[from] zbus::Error),

    /// A D-Bus value had an unexpected shape.
    #[error("D-Bus value error: {0}")]
    Variant(#[from] zvariant::Error),

    /// No managed Wi-Fi device was found on the system.
    #[error("no Wi-Fi device found")]
    NoWifiDevice,

    /// Scanning kept coming back empty.
    #[error("no access point found")]
    NoAccessPoint,

    /// The requested network was not in the scan result.
    #[error("could not find access point with ssid: {0}")]
    NotFound(String),

    /// `create` was called while the hotspot is up.
    #[error("hotspot already created")]
    HotspotAlreadyCreated,

    /// The profile did not reach the activated state in time.
    #[error("connection could not be activated")]
    ActivationTimeout,

    /// The helper process could not be started.
    #[error("failed to start {id}: {source}")]
    Spawn {
        id: String,
        #[source]
        source: std::io::Error,
    },

    /// The helper process came up without readable output pipes.
    #[error("failed to capture output of {0}")]
    MissingPipe(String),

    /// The portal-facing service failed.
    #[error("portal service error: {0}")]
    Service(String),

    /// The operation was abandoned because the portal is shutting down.
    #[error("operation cancelled")]
    Cancelled,

    /// The portal task is no longer running.
    #[error("portal is not running")]
    PortalStopped,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn security_label_picks_highest_flag() {
        assert_eq!(Security::empty().label(), "none");
        assert_eq!(Security::WEP.label(), "wep");
        assert_eq!(Security::WPA.label(), "wpa");
        assert_eq!((Security::WPA | Security::WPA2).label(), "wp2");
        assert_eq!((Security::WPA2 | Security::ENTERPRISE).label(), "enterprise");
    }

    #[test]
    fn security_display_matches_label() {
        assert_eq!(format!("{}", Security::WPA2), "wp2");
        assert_eq!(format!("{}", Security::empty()), "none");
    }

    #[test]
    fn summary_hides_strength() {
        let ap = AccessPoint {
            ssid: "Home".into(),
            path: OwnedObjectPath::try_from("/org/freedesktop/NetworkManager/AccessPoint/1")
                .unwrap(),
            strength: 80,
            security: Security::WPA2,
        };
        assert_eq!(
            ap.summary(),
            AccessPointSummary {
                ssid: "Home".into(),
                security: "wp2".into(),
            }
        );
    }

    #[test]
    fn active_connection_state_from_u32() {
        assert_eq!(ActiveConnectionState::from(1), ActiveConnectionState::Activating);
        assert_eq!(ActiveConnectionState::from(2), ActiveConnectionState::Activated);
        assert_eq!(ActiveConnectionState::from(4), ActiveConnectionState::Deactivated);
        assert_eq!(ActiveConnectionState::from(9), ActiveConnectionState::Other(9));
    }

    #[test]
    fn connectivity_limited_counts_as_established() {
        assert!(ConnectivityState::from(4).is_established());
        assert!(ConnectivityState::from(3).is_established());
        assert!(!ConnectivityState::from(2).is_established());
        assert!(!ConnectivityState::from(1).is_established());
        assert!(!ConnectivityState::from(0).is_established());
    }

    #[test]
    fn connectivity_display() {
        assert_eq!(format!("{}", ConnectivityState::Limited), "limited");
        assert_eq!(format!("{}", ConnectivityState::Other(7)), "unknown connectivity (7)");
    }

    #[test]
    fn hotspot_state_defaults_to_closed() {
        assert!(!HotspotState::default().is_created());
    }
}
