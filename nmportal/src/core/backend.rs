//! The NetworkManager operations the engine depends on.
//!
//! [`NetworkBackend`] is the seam between the provisioning logic and D-Bus.
//! [`NmBackend`] talks to the real daemon on the system bus; tests plug in a
//! scripted implementation.

use async_trait::async_trait;
use log::debug;
use zbus::Connection;
use zvariant::OwnedObjectPath;

use crate::Result;
use crate::api::builders::ConnectionSettings;
use crate::api::models::{
    ActivatedProfile, ActiveConnectionState, ApCapabilities, ConnectivityState, SavedProfile,
};
use crate::core::connection_settings::{available_profiles, delete_connection};
use crate::core::device::{WifiDevice, find_wifi_device};
use crate::dbus::{NMAccessPointProxy, NMActiveConnectionProxy, NMProxy, NMWirelessProxy};
use crate::types::constants::NULL_PATH;

/// Access to NetworkManager, scoped to the one wireless device the portal
/// drives.
#[async_trait]
pub trait NetworkBackend: Send + Sync {
    /// Interface name of the wireless device (e.g. `wlan0`).
    fn interface_name(&self) -> &str;

    /// Access points currently visible to the device.
    async fn visible_access_points(&self) -> Result<Vec<OwnedObjectPath>>;

    /// Raw SSID bytes of an access point.
    async fn access_point_ssid(&self, ap: &OwnedObjectPath) -> Result<Vec<u8>>;

    /// Signal strength of an access point in percent.
    async fn access_point_strength(&self, ap: &OwnedObjectPath) -> Result<u8>;

    /// Capability words used for security classification.
    async fn access_point_capabilities(&self, ap: &OwnedObjectPath) -> Result<ApCapabilities>;

    /// Profiles that can be activated on the device.
    async fn saved_profiles(&self) -> Result<Vec<SavedProfile>>;

    async fn delete_profile(&self, profile: &OwnedObjectPath) -> Result<()>;

    /// Creates a profile from `settings` and activates it on the device.
    ///
    /// `specific_object` selects the access point to join; `None` lets
    /// NetworkManager decide, which is what AP mode needs.
    async fn add_and_activate(
        &self,
        settings: ConnectionSettings,
        specific_object: Option<&OwnedObjectPath>,
    ) -> Result<ActivatedProfile>;

    async fn deactivate(&self, active: &OwnedObjectPath) -> Result<()>;

    async fn activation_state(&self, active: &OwnedObjectPath) -> Result<ActiveConnectionState>;

    /// Global connectivity as last checked by NetworkManager.
    async fn connectivity(&self) -> Result<ConnectivityState>;
}

/// [`NetworkBackend`] backed by NetworkManager on the system bus.
pub struct NmBackend {
    conn: Connection,
    device: WifiDevice,
}

impl NmBackend {
    /// Connects to the system bus and resolves the wireless device.
    ///
    /// With `interface` set, only that interface is accepted. Fails with
    /// [`PortalError::NoWifiDevice`](crate::PortalError::NoWifiDevice) when
    /// no managed Wi-Fi device is present.
    pub async fn new(interface: Option<&str>) -> Result<Self> {
        let conn = Connection::system().await?;
        Self::with_connection(conn, interface).await
    }

    /// Like [`NmBackend::new`] but on an existing bus connection.
    pub async fn with_connection(conn: Connection, interface: Option<&str>) -> Result<Self> {
        let device = find_wifi_device(&conn, interface).await?;
        Ok(Self { conn, device })
    }

    async fn access_point(&self, ap: &OwnedObjectPath) -> Result<NMAccessPointProxy<'_>> {
        Ok(NMAccessPointProxy::builder(&self.conn)
            .path(ap.clone())?
            .build()
            .await?)
    }
}

#[async_trait]
impl NetworkBackend for NmBackend {
    fn interface_name(&self) -> &str {
        &self.device.interface
    }

    async fn visible_access_points(&self) -> Result<Vec<OwnedObjectPath>> {
        let wifi = NMWirelessProxy::builder(&self.conn)
            .path(self.device.path.clone())?
            .build()
            .await?;
        Ok(wifi.access_points().await?)
    }

    async fn access_point_ssid(&self, ap: &OwnedObjectPath) -> Result<Vec<u8>> {
        Ok(self.access_point(ap).await?.ssid().await?)
    }

    async fn access_point_strength(&self, ap: &OwnedObjectPath) -> Result<u8> {
        Ok(self.access_point(ap).await?.strength().await?)
    }

    async fn access_point_capabilities(&self, ap: &OwnedObjectPath) -> Result<ApCapabilities> {
        let proxy = self.access_point(ap).await?;
        Ok(ApCapabilities {
            flags: proxy.flags().await?,
            wpa_flags: proxy.wpa_flags().await?,
            rsn_flags: proxy.rsn_flags().await?,
        })
    }

    async fn saved_profiles(&self) -> Result<Vec<SavedProfile>> {
        available_profiles(&self.conn, &self.device.path).await
    }

    async fn delete_profile(&self, profile: &OwnedObjectPath) -> Result<()> {
        delete_connection(&self.conn, profile).await
    }

    async fn add_and_activate(
        &self,
        settings: ConnectionSettings,
        specific_object: Option<&OwnedObjectPath>,
    ) -> Result<ActivatedProfile> {
        let nm = NMProxy::new(&self.conn).await?;
        let specific_object = match specific_object {
            Some(path) => path.clone(),
            None => OwnedObjectPath::try_from(NULL_PATH)?,
        };

        let (connection, active) = nm
            .add_and_activate_connection(settings, self.device.path.clone(), specific_object)
            .await?;
        debug!(
            "add_and_activate_connection() succeeded, active connection: {}",
            active.as_str()
        );

        Ok(ActivatedProfile { connection, active })
    }

    async fn deactivate(&self, active: &OwnedObjectPath) -> Result<()> {
        let nm = NMProxy::new(&self.conn).await?;
        nm.deactivate_connection(active.clone()).await?;
        Ok(())
    }

    async fn activation_state(&self, active: &OwnedObjectPath) -> Result<ActiveConnectionState> {
        let ac = NMActiveConnectionProxy::builder(&self.conn)
            .path(active.clone())?
            .build()
            .await?;
        Ok(ac.state().await?.into())
    }

    async fn connectivity(&self) -> Result<ConnectivityState> {
        let nm = NMProxy::new(&self.conn).await?;
        Ok(nm.connectivity().await?.into())
    }
}
