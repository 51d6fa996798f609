//! NetworkManager Device proxy.

use zbus::{Result, proxy};
use zvariant::OwnedObjectPath;

/// Proxy for NetworkManager device interface.
///
/// Used to find the Wi-Fi device at startup and to list the connection
/// profiles that could be activated on it.
#[proxy(
    interface = "org.freedesktop.NetworkManager.Device",
    default_service = "org.freedesktop.NetworkManager"
)]
pub trait NMDevice {
    /// The network interface name (e.g., "wlan0").
    #[zbus(property)]
    fn interface(&self) -> Result<String>;

    /// Device type as a numeric code (2 = Wi-Fi).
    #[zbus(property)]
    fn device_type(&self) -> Result<u32>;

    /// Current device state (10 = unmanaged, 100 = activated).
    #[zbus(property)]
    fn state(&self) -> Result<u32>;

    /// Saved connection profiles compatible with this device.
    #[zbus(property)]
    fn available_connections(&self) -> Result<Vec<OwnedObjectPath>>;
}
