//! Saved connection profile management.
//!
//! Lists the profiles NetworkManager considers usable on the wireless
//! device and deletes them. Only the stored SSID is ever inspected.

use log::{debug, warn};
use std::collections::HashMap;
use zbus::Connection;
use zvariant::{OwnedObjectPath, OwnedValue, Value};

use crate::Result;
use crate::api::models::SavedProfile;
use crate::dbus::{NMDeviceProxy, NMSettingsConnectionProxy};
use crate::util::utils::decode_ssid_or_empty;

/// Returns every profile available on `device` together with its SSID.
///
/// Profiles whose settings cannot be read are skipped with a warning.
pub(crate) async fn available_profiles(
    conn: &Connection,
    device: &OwnedObjectPath,
) -> Result<Vec<SavedProfile>> {
    let dev = NMDeviceProxy::builder(conn)
        .path(device.clone())?
        .build()
        .await?;

    let mut profiles = Vec::new();
    for cpath in dev.available_connections().await? {
        let cproxy = NMSettingsConnectionProxy::builder(conn)
            .path(cpath.clone())?
            .build()
            .await?;

        let settings = match cproxy.get_settings().await {
            Ok(s) => s,
            Err(e) => {
                warn!("Failed to read settings of {}: {e}", cpath.as_str());
                continue;
            }
        };

        profiles.push(SavedProfile {
            ssid: stored_ssid(&settings),
            path: cpath,
        });
    }

    Ok(profiles)
}

/// Deletes a saved connection by its D-Bus path.
pub(crate) async fn delete_connection(conn: &Connection, conn_path: &OwnedObjectPath) -> Result<()> {
    let cproxy = NMSettingsConnectionProxy::builder(conn)
        .path(conn_path.clone())?
        .build()
        .await?;

    cproxy.delete().await?;
    debug!("Deleted connection: {}", conn_path.as_str());
    Ok(())
}

/// Extracts `802-11-wireless.ssid` from a `GetSettings` reply.
pub(crate) fn stored_ssid(settings: &HashMap<String, HashMap<String, OwnedValue>>) -> Option<String> {
    let wifi_sec = settings.get("802-11-wireless")?;
    ssid_from_value(wifi_sec.get("ssid")?)
}

/// Decodes an `ay` SSID value. Empty or non UTF-8 SSIDs yield `None`.
pub(crate) fn ssid_from_value(value: &Value<'_>) -> Option<String> {
    let Value::Array(arr) = value else {
        return None;
    };

    let mut raw = Vec::new();
    for v in arr.iter() {
        if let Ok(b) = u8::try_from(v.clone()) {
            raw.push(b);
        }
    }

    let ssid = decode_ssid_or_empty(&raw);
    (!ssid.is_empty()).then(|| ssid.into_owned())
}
