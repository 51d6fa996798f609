//! NetworkManager saved connection proxy.

use std::collections::HashMap;
use zbus::{Result, proxy};
use zvariant::OwnedValue;

/// Proxy for a single saved connection profile.
///
/// Lives at `/org/freedesktop/NetworkManager/Settings/<n>`. Secrets are not
/// included in `GetSettings`, which is fine since only the SSID is read.
#[proxy(
    interface = "org.freedesktop.NetworkManager.Settings.Connection",
    default_service = "org.freedesktop.NetworkManager"
)]
pub trait NMSettingsConnection {
    /// Returns the profile as a section -> key -> value dictionary.
    fn get_settings(&self) -> Result<HashMap<String, HashMap<String, OwnedValue>>>;

    /// Permanently removes the profile.
    fn delete(&self) -> Result<()>;
}
