//! Wireless device resolution.
//!
//! The portal drives exactly one Wi-Fi device for its whole lifetime. It is
//! picked once at startup.

use log::{debug, info};
use zbus::Connection;
use zvariant::OwnedObjectPath;

use crate::Result;
use crate::api::models::PortalError;
use crate::dbus::{NMDeviceProxy, NMProxy};
use crate::types::constants::{device_state, device_type};

/// A Wi-Fi device NetworkManager is willing to drive.
#[derive(Debug, Clone)]
pub(crate) struct WifiDevice {
    pub path: OwnedObjectPath,
    pub interface: String,
}

/// Finds the first managed Wi-Fi device.
///
/// With `interface` set, only the device with that interface name is
/// accepted. Returns [`PortalError::NoWifiDevice`] when nothing matches.
pub(crate) async fn find_wifi_device(
    conn: &Connection,
    interface: Option<&str>,
) -> Result<WifiDevice> {
    let nm = NMProxy::new(conn).await?;
    let devices = nm.get_devices().await?;

    for dp in devices {
        let dev = NMDeviceProxy::builder(conn)
            .path(dp.clone())?
            .build()
            .await?;

        if dev.device_type().await? != device_type::WIFI {
            continue;
        }

        let name = dev.interface().await?;
        if dev.state().await? == device_state::UNMANAGED {
            debug!("Skipping unmanaged Wi-Fi device {name}");
            continue;
        }

        if interface.is_some_and(|wanted| wanted != name) {
            debug!("Skipping Wi-Fi device {name}, not the configured interface");
            continue;
        }

        info!("Using Wi-Fi device {name} ({})", dp.as_str());
        return Ok(WifiDevice {
            path: dp,
            interface: name,
        });
    }

    Err(PortalError::NoWifiDevice)
}
